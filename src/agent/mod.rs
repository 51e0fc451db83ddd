/*!
 * Parallel RPC Agent
 * Best-effort broadcast of one request to many nodes with bounded
 * concurrency, per-target deadlines, and liveness reporting
 */

pub mod dispatch;
pub mod types;

// Re-export public API
pub use dispatch::Agent;
pub use types::{AgentReport, AgentTask, MessageType, Request, Response, Target, TargetState};
