/*!
 * Core Types
 * Common identifiers and the controller-side job view
 */

use std::time::{SystemTime, UNIX_EPOCH};

/// Resolved user identifier
pub type UserId = u32;

/// Controller job identifier
pub type JobId = u32;

/// Wall-clock timestamp in whole seconds since the epoch
pub type Timestamp = u64;

/// Current wall-clock time as a [`Timestamp`].
#[inline]
#[must_use]
pub fn epoch_secs() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Read-only view of a controller job table entry.
///
/// The job table itself belongs to the controller; the engine only sees
/// copies handed across the [`JobLookup`](super::traits::JobLookup) seam.
/// `nice` and `priority` are mutated in place when a priority boost applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: JobId,
    pub user_id: UserId,
    pub array_job_id: u32,
    pub array_task_id: u32,
    /// Expected start time, 0 while undetermined.
    pub start_time: Timestamp,
    /// Expected completion time, 0 while undetermined.
    pub end_time: Timestamp,
    pub nice: u32,
    pub priority: u32,
}

impl JobRecord {
    /// Create a minimal record for the given job and owner.
    #[must_use]
    pub fn new(job_id: JobId, user_id: UserId) -> Self {
        Self {
            job_id,
            user_id,
            array_job_id: 0,
            array_task_id: 0,
            start_time: 0,
            end_time: 0,
            nice: crate::core::limits::NICE_OFFSET,
            priority: 0,
        }
    }
}
