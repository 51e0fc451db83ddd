/*!
 * Error Types
 * Centralized error handling with thiserror
 */

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to find configuration file {primary} or {fallback}")]
    Missing { primary: String, fallback: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed value for {key}: {value:?}")]
    Malformed { key: String, value: String },
}

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("No script specified")]
    NoScript,

    #[error("{script_type} is not a fully qualified pathname ({path})")]
    NotAbsolute { script_type: String, path: String },

    #[error("{script_type} can not be executed ({path})")]
    NotExecutable { script_type: String, path: String },

    #[error("Failed to spawn {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error reading script output: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Buffer truncated: needed {needed} more bytes")]
    Truncated { needed: usize },

    #[error("Packed string is not valid UTF-8")]
    BadString,

    #[error("Unsupported protocol version {0}")]
    UnsupportedVersion(u16),
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open message connection: {0}")]
    Connect(String),

    #[error("Failed to send request: {0}")]
    Send(String),

    #[error("Failed to receive response: {0}")]
    Receive(String),

    #[error("Failed to shut down message connection: {0}")]
    Shutdown(String),

    #[error("Operation timed out")]
    TimedOut,
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Agent passed invalid message type {0:?}")]
    InvalidMessageType(crate::agent::MessageType),

    #[error("Internal agent error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    #[error("Pack error: {0}")]
    Pack(#[from] PackError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
