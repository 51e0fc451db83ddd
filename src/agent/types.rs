/*!
 * Agent Types
 * Message vocabulary, fan-out task description, and per-target tracking
 */

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Controller RPC vocabulary.
///
/// Only a small closed subset may be broadcast through the agent; the
/// rest travel on dedicated paths and are rejected at dispatch entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    RevokeJobCredential,
    NodeRegistrationStatus,
    Ping,
    BatchJobLaunch,
    ShutdownDaemon,
}

impl MessageType {
    /// True for the message types the agent is allowed to broadcast.
    #[must_use]
    pub fn is_agent_dispatchable(self) -> bool {
        matches!(
            self,
            Self::RevokeJobCredential | Self::NodeRegistrationStatus | Self::Ping
        )
    }
}

/// One typed request, with an opaque payload owned by the caller's codec.
#[derive(Debug, Clone)]
pub struct Request {
    pub msg_type: MessageType,
    pub payload: Vec<u8>,
}

impl Request {
    #[must_use]
    pub fn new(msg_type: MessageType) -> Self {
        Self {
            msg_type,
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}

/// Typed response from a node daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The universal acknowledgement; non-zero means the node refused.
    ReturnCode(i32),
    /// Registration details, only ever seen on dedicated paths.
    Registration { node: String, responding: bool },
}

/// One fan-out destination.
#[derive(Debug, Clone)]
pub struct Target {
    pub addr: SocketAddr,
    pub name: String,
}

impl Target {
    #[must_use]
    pub fn new(addr: SocketAddr, name: impl Into<String>) -> Self {
        Self {
            addr,
            name: name.into(),
        }
    }
}

/// A broadcast order: one request, many targets.
#[derive(Debug, Clone)]
pub struct AgentTask {
    pub targets: Vec<Target>,
    pub msg_type: MessageType,
    pub payload: Vec<u8>,
}

impl AgentTask {
    #[must_use]
    pub fn new(msg_type: MessageType, targets: Vec<Target>) -> Self {
        Self {
            targets,
            msg_type,
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }
}

/// Per-target delivery state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    New,
    Active,
    Done,
    Failed,
}

impl TargetState {
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Book-keeping for one worker, only ever touched under the shared mutex.
#[derive(Debug)]
pub(crate) struct TargetRecord {
    pub state: TargetState,
    /// Activation instant while running.
    pub started: Option<Instant>,
    /// Total delivery time once terminal.
    pub elapsed: Option<Duration>,
    pub target: Target,
}

impl TargetRecord {
    pub fn new(target: Target) -> Self {
        Self {
            state: TargetState::New,
            started: None,
            elapsed: None,
            target,
        }
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentReport {
    /// Targets that acknowledged with return code 0.
    pub delivered: u32,
    /// Targets that failed or timed out.
    pub failed: u32,
    /// Longest successful delivery.
    pub max_delay: Duration,
}
