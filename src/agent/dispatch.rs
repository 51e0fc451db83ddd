/*!
 * Agent Dispatch
 * Bounded-concurrency broadcast with a deadline-enforcing watchdog
 *
 * The dispatcher admits at most AGENT_THREAD_COUNT workers at once, each
 * detached and bound to one target. Delivery is best-effort: the outcome
 * is observed through the per-target state machine, never by joining
 * workers. The watchdog is the only joined thread; it polls the records,
 * tracks delays and failures, and reports per-node liveness once every
 * target is terminal.
 */

use super::types::{
    AgentReport, AgentTask, Request, Response, TargetRecord, TargetState,
};
use crate::core::errors::AgentError;
use crate::core::limits::{AGENT_THREAD_COUNT, COMMAND_TIMEOUT};
use crate::core::traits::{NodeLiveness, Transport};
use log::{debug, error, warn};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct Shared {
    inner: Mutex<Inner>,
    cond: Condvar,
}

struct Inner {
    records: Vec<TargetRecord>,
    active: usize,
}

/// Parallel RPC agent bound to a transport and a liveness sink.
pub struct Agent {
    transport: Arc<dyn Transport>,
    liveness: Arc<dyn NodeLiveness>,
    command_timeout: Duration,
}

impl Agent {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, liveness: Arc<dyn NodeLiveness>) -> Self {
        Self {
            transport,
            liveness,
            command_timeout: COMMAND_TIMEOUT,
        }
    }

    /// Override the per-target deadline.
    #[must_use]
    pub fn with_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Broadcast one request to every target, bounded in concurrency,
    /// and return once every target has a terminal outcome.
    pub fn dispatch(&self, task: AgentTask) -> Result<AgentReport, AgentError> {
        if !task.msg_type.is_agent_dispatchable() {
            return Err(AgentError::InvalidMessageType(task.msg_type));
        }
        if task.targets.is_empty() {
            return Ok(AgentReport::default());
        }

        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner {
                records: task
                    .targets
                    .into_iter()
                    .map(TargetRecord::new)
                    .collect(),
                active: 0,
            }),
            cond: Condvar::new(),
        });
        let request = Arc::new(Request {
            msg_type: task.msg_type,
            payload: task.payload,
        });
        let target_count = shared.inner.lock().records.len();

        let wdog = {
            let shared = Arc::clone(&shared);
            let liveness = Arc::clone(&self.liveness);
            let timeout = self.command_timeout;
            thread::spawn(move || watchdog(&shared, liveness.as_ref(), timeout))
        };

        for index in 0..target_count {
            // Wait until there is room for another worker
            {
                let mut inner = shared.inner.lock();
                while inner.active >= AGENT_THREAD_COUNT {
                    shared.cond.wait(&mut inner);
                }
                inner.active += 1;
            }

            let shared = Arc::clone(&shared);
            let transport = Arc::clone(&self.transport);
            let request = Arc::clone(&request);
            let timeout = self.command_timeout;
            thread::spawn(move || worker(index, &shared, transport.as_ref(), &request, timeout));
        }

        wdog.join()
            .map_err(|_| AgentError::Internal("watchdog thread panicked".to_string()))
    }
}

/// Deliver the request to one target and record the outcome.
fn worker(
    index: usize,
    shared: &Shared,
    transport: &dyn Transport,
    request: &Request,
    timeout: Duration,
) {
    let (addr, name) = {
        let mut inner = shared.inner.lock();
        let record = &mut inner.records[index];
        record.state = TargetState::Active;
        record.started = Some(Instant::now());
        (record.target.addr, record.target.name.clone())
    };

    let deadline = Instant::now() + timeout;
    let state = match transport.exchange(addr, request, deadline) {
        Ok(Response::ReturnCode(0)) => {
            debug!("agent successfully processed RPC to node {}", name);
            TargetState::Done
        }
        Ok(Response::ReturnCode(rc)) => {
            error!("agent RPC to node {} refused with rc {}", name, rc);
            TargetState::Failed
        }
        Ok(other) => {
            error!("agent RPC to node {} got unexpected response {:?}", name, other);
            TargetState::Failed
        }
        Err(e) => {
            error!("agent RPC to node {} failed: {}", name, e);
            TargetState::Failed
        }
    };

    let mut inner = shared.inner.lock();
    let record = &mut inner.records[index];
    record.state = state;
    record.elapsed = record.started.map(|s| s.elapsed());
    inner.active -= 1;
    // Make room for the next queued worker
    shared.cond.notify_one();
}

fn wdog_poll(timeout: Duration) -> Duration {
    if timeout <= Duration::from_secs(1) {
        Duration::from_secs(1)
    } else {
        Duration::from_secs(2)
    }
}

/// Poll the per-target records until all are terminal, then report
/// liveness and summarize the broadcast.
fn watchdog(shared: &Shared, liveness: &dyn NodeLiveness, timeout: Duration) -> AgentReport {
    let poll = wdog_poll(timeout);
    let mut max_delay = Duration::ZERO;

    loop {
        thread::sleep(poll);

        let inner = shared.inner.lock();
        let mut work_done = true;
        for record in &inner.records {
            match record.state {
                TargetState::Active => {
                    work_done = false;
                    let overdue = record
                        .started
                        .map(|s| s.elapsed() >= timeout)
                        .unwrap_or(false);
                    if overdue {
                        // The transport owns deadline enforcement; an
                        // overdue worker means it is not honouring it.
                        warn!("node {} still active past deadline", record.target.name);
                    }
                }
                TargetState::New => work_done = false,
                TargetState::Done => {
                    if let Some(elapsed) = record.elapsed {
                        max_delay = max_delay.max(elapsed);
                    }
                }
                TargetState::Failed => {}
            }
        }
        if !work_done {
            continue;
        }

        // All targets terminal: collect the verdicts under the lock
        let mut responded = Vec::new();
        let mut not_responding = Vec::new();
        for record in &inner.records {
            match record.state {
                TargetState::Done => responded.push(record.target.name.clone()),
                TargetState::Failed => not_responding.push(record.target.name.clone()),
                TargetState::New | TargetState::Active => {}
            }
        }
        drop(inner);

        // Liveness updates run back to back; the sink serializes them
        // under the controller's node-write lock.
        for name in &not_responding {
            liveness.node_not_responding(name);
        }
        for name in &responded {
            liveness.node_did_respond(name);
        }

        if max_delay > Duration::ZERO {
            debug!("agent maximum delay {:?}", max_delay);
        }

        return AgentReport {
            delivered: responded.len() as u32,
            failed: not_responding.len() as u32,
            max_delay,
        };
    }
}
