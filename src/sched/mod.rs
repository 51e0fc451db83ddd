/*!
 * Scheduling Hooks
 * Queue ordering, preemption ordering, and use-time estimation
 */

use crate::core::traits::JobLookup;
use crate::core::types::{epoch_secs, JobId, JobRecord, Timestamp, UserId};
use crate::state::BbState;
use log::error;
use std::cmp::Ordering;

const HOUR_SECS: u64 = 60 * 60;
const DAY_SECS: u64 = 24 * 60 * 60;

/// Candidate buffer for preemption, ordered latest-use first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreemptCandidate {
    pub job_id: JobId,
    pub user_id: UserId,
    pub size: u32,
    pub use_time: Timestamp,
}

/// Job queue order: ascending expected start time.
#[must_use]
pub fn job_queue_cmp(a: &JobRecord, b: &JobRecord) -> Ordering {
    a.start_time.cmp(&b.start_time)
}

/// Preemption order: decreasing use time, so the buffers needed furthest
/// in the future are reclaimed first.
#[must_use]
pub fn preempt_queue_cmp(a: &PreemptCandidate, b: &PreemptCandidate) -> Ordering {
    b.use_time.cmp(&a.use_time)
}

/// Set each allocation's `use_time` to the time its use is expected to
/// begin, and refresh the instance-wide next-release estimate.
///
/// Job-bound buffers staging toward a run take the job's expected start;
/// a vanished job pushes the estimate a day out. Buffers without a job
/// are usable now.
pub fn set_use_time(state: &BbState, jobs: &dyn JobLookup) {
    let now = epoch_secs();
    let mut inner = state.lock();
    let mut next_end_time = now + HOUR_SECS;

    for alloc in inner.allocs.iter_mut() {
        if alloc.job_id != 0 && alloc.state.is_staging_in() {
            match jobs.find_job(alloc.job_id) {
                None => {
                    error!(
                        "job {} with allocated burst buffers not found",
                        alloc.job_id
                    );
                    alloc.use_time = now + DAY_SECS;
                }
                Some(job) if job.start_time != 0 => {
                    alloc.end_time = job.end_time;
                    alloc.use_time = job.start_time;
                }
                Some(_) => {
                    // Start time not yet determined
                    alloc.use_time = now + HOUR_SECS;
                }
            }
        } else if alloc.job_id != 0 {
            if let Some(job) = jobs.find_job(alloc.job_id) {
                alloc.end_time = job.end_time;
            }
        } else {
            alloc.use_time = now;
        }

        if alloc.end_time != 0 && alloc.size != 0 {
            if alloc.end_time <= now {
                next_end_time = now;
            } else if next_end_time > alloc.end_time {
                next_end_time = alloc.end_time;
            }
        }
    }

    inner.next_end_time = next_end_time;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(job_id: JobId, use_time: Timestamp) -> PreemptCandidate {
        PreemptCandidate {
            job_id,
            user_id: 1000,
            size: 1,
            use_time,
        }
    }

    #[test]
    fn test_job_queue_ascending_start() {
        let mut a = JobRecord::new(1, 1000);
        let mut b = JobRecord::new(2, 1000);
        a.start_time = 200;
        b.start_time = 100;

        let mut queue = vec![a.clone(), b.clone()];
        queue.sort_by(job_queue_cmp);
        assert_eq!(queue[0].job_id, 2);
        assert_eq!(queue[1].job_id, 1);
    }

    #[test]
    fn test_preempt_queue_latest_use_first() {
        let mut queue = vec![candidate(1, 100), candidate(2, 300), candidate(3, 200)];
        queue.sort_by(preempt_queue_cmp);
        let ids: Vec<JobId> = queue.iter().map(|c| c.job_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
