/*!
 * Collaborator Traits
 * Seams to the controller subsystems this library does not own
 */

use super::types::{JobId, JobRecord, Timestamp, UserId};
use crate::agent::{Request, Response};
use crate::core::errors::TransportError;
use std::net::SocketAddr;
use std::time::Instant;

/// Read-only lookups into the controller's job table.
pub trait JobLookup {
    /// Return a copy of the job record, or None if the job is unknown.
    fn find_job(&self, job_id: JobId) -> Option<JobRecord>;
}

/// User-name resolution against the system's account database.
pub trait UserResolver {
    fn uid_from_name(&self, name: &str) -> Option<UserId>;
    fn name_from_uid(&self, uid: UserId) -> Option<String>;
}

/// Liveness reporting into the controller's node table.
///
/// Implementations serialize both calls under the controller's node-write
/// lock; the agent invokes them only with terminal per-target states.
pub trait NodeLiveness: Send + Sync {
    fn node_did_respond(&self, node: &str);
    fn node_not_responding(&self, node: &str);
}

/// Typed message transport to a single remote node.
///
/// One call covers the full connect/send/receive/shutdown cycle. The
/// implementation must honour `deadline` on every blocking step and surface
/// [`TransportError::TimedOut`] once it passes.
pub trait Transport: Send + Sync {
    fn exchange(
        &self,
        addr: SocketAddr,
        request: &Request,
        deadline: Instant,
    ) -> std::result::Result<Response, TransportError>;
}

/// A no-op job table for contexts with no controller attached.
pub struct EmptyJobTable;

impl JobLookup for EmptyJobTable {
    fn find_job(&self, _job_id: JobId) -> Option<JobRecord> {
        None
    }
}

/// In-memory job table for callers without a live controller attached.
#[derive(Default)]
pub struct StaticJobTable {
    jobs: Vec<JobRecord>,
}

impl StaticJobTable {
    #[must_use]
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn insert(&mut self, job: JobRecord) {
        self.jobs.retain(|j| j.job_id != job.job_id);
        self.jobs.push(job);
    }

    pub fn set_times(&mut self, job_id: JobId, start_time: Timestamp, end_time: Timestamp) {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.job_id == job_id) {
            job.start_time = start_time;
            job.end_time = end_time;
        }
    }
}

impl JobLookup for StaticJobTable {
    fn find_job(&self, job_id: JobId) -> Option<JobRecord> {
        self.jobs.iter().find(|j| j.job_id == job_id).cloned()
    }
}
