/*!
 * State Engine
 * Mutex-guarded per-plugin-instance state: configuration, allocation and
 * user tables, space accounting, and the termination signal
 */

pub mod tables;

use crate::config::BbConfig;
use crate::core::types::{epoch_secs, JobRecord, Timestamp, UserId};
use crate::pools::PoolEntry;
use log::{error, info};
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

// Re-export public API
pub use tables::{AllocState, AllocTable, BbAlloc, BbUser, UserTable};

/// Everything guarded by the state mutex.
#[derive(Debug, Default)]
pub struct StateInner {
    pub config: BbConfig,
    pub allocs: AllocTable,
    pub users: UserTable,
    pub total_space: u32,
    pub used_space: u32,
    /// Estimated time at which the next allocation frees up.
    pub next_end_time: Timestamp,
    pub pools: Vec<PoolEntry>,
}

/// Cooperative termination signal: a flag plus a condition to interrupt
/// sleepers.
#[derive(Debug, Default)]
struct TermSignal {
    flag: Mutex<bool>,
    cond: Condvar,
}

/// Per-plugin-instance engine state.
///
/// Multiple instances may coexist; they share nothing. Every public
/// operation takes the state mutex for its whole duration.
#[derive(Debug, Default)]
pub struct BbState {
    inner: Mutex<StateInner>,
    term: TermSignal,
}

impl BbState {
    #[must_use]
    pub fn new(config: BbConfig) -> Self {
        Self {
            inner: Mutex::new(StateInner {
                config,
                ..StateInner::default()
            }),
            term: TermSignal::default(),
        }
    }

    /// Scoped access to the guarded state. Composite operations (the
    /// snapshot packer, the scheduling hooks) run under one acquisition.
    pub fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock()
    }

    /// Allocate a named buffer record, not bound to any job.
    pub fn alloc_name(&self, name: &str, user_id: UserId) {
        let mut inner = self.inner.lock();
        inner.alloc_name_rec(name, user_id);
    }

    /// Allocate a per-job buffer record and account its size to the owner,
    /// boosting the job's priority if so configured.
    pub fn alloc_job(&self, job: &mut JobRecord, size: u32) {
        let mut inner = self.inner.lock();
        inner.alloc_job(job, size);
    }

    /// Release the buffer bound to `job`, returning whether one existed.
    pub fn release_job_alloc(&self, job: &JobRecord) -> bool {
        let mut inner = self.inner.lock();
        match inner.allocs.remove_job(job) {
            Some(alloc) => {
                inner.remove_user_load(alloc.user_id, alloc.size, alloc.job_id);
                true
            }
            None => false,
        }
    }

    /// Change the lifecycle state of the buffer bound to `job`.
    pub fn set_job_alloc_state(&self, job: &JobRecord, state: AllocState) -> bool {
        let mut inner = self.inner.lock();
        match inner.allocs.find_job_mut(job) {
            Some(alloc) => {
                alloc.state = state;
                alloc.state_time = epoch_secs();
                true
            }
            None => false,
        }
    }

    /// Copy of the buffer record bound to `job`, if any.
    #[must_use]
    pub fn find_job_alloc(&self, job: &JobRecord) -> Option<BbAlloc> {
        self.inner.lock().allocs.find_job(job).cloned()
    }

    /// Drop all cached allocation and user records.
    pub fn clear_cache(&self) {
        let mut inner = self.inner.lock();
        inner.allocs.clear();
        inner.users.clear();
        inner.used_space = 0;
    }

    #[must_use]
    pub fn used_space(&self) -> u32 {
        self.inner.lock().used_space
    }

    #[must_use]
    pub fn total_space(&self) -> u32 {
        self.inner.lock().total_space
    }

    pub fn set_total_space(&self, total: u32) {
        self.inner.lock().total_space = total;
    }

    /// Aggregate size currently held by `user_id`, 0 if unknown.
    #[must_use]
    pub fn user_total(&self, user_id: UserId) -> u32 {
        self.inner
            .lock()
            .users
            .get(user_id)
            .map(|u| u.total_size)
            .unwrap_or(0)
    }

    #[must_use]
    pub fn next_end_time(&self) -> Timestamp {
        self.inner.lock().next_end_time
    }

    /// Sleep up to `seconds`, returning early if termination is requested.
    pub fn sleep_interruptible(&self, seconds: u64) {
        let mut flag = self.term.flag.lock();
        if *flag {
            return;
        }
        let _ = self
            .term
            .cond
            .wait_for(&mut flag, Duration::from_secs(seconds));
    }

    /// Set the termination flag and wake every sleeper.
    pub fn request_termination(&self) {
        let mut flag = self.term.flag.lock();
        *flag = true;
        self.term.cond.notify_all();
    }

    #[must_use]
    pub fn terminating(&self) -> bool {
        *self.term.flag.lock()
    }
}

impl StateInner {
    /// Create a named allocation record at its bucket head.
    pub fn alloc_name_rec(&mut self, name: &str, user_id: UserId) -> &mut BbAlloc {
        let now = epoch_secs();
        self.allocs.insert(BbAlloc {
            user_id,
            name: Some(name.to_string()),
            state: AllocState::Allocated,
            state_time: now,
            seen_time: now,
            ..BbAlloc::default()
        })
    }

    /// Create a per-job allocation record at its bucket head.
    pub fn alloc_job_rec(&mut self, job: &JobRecord, size: u32) -> &mut BbAlloc {
        let now = epoch_secs();
        self.allocs.insert(BbAlloc {
            user_id: job.user_id,
            job_id: job.job_id,
            array_job_id: job.array_job_id,
            array_task_id: job.array_task_id,
            size,
            state: AllocState::Allocated,
            state_time: now,
            seen_time: now,
            ..BbAlloc::default()
        })
    }

    /// Account an allocation's size to the instance and the owning user.
    pub fn add_user_load(&mut self, user_id: UserId, size: u32) {
        self.used_space += size;
        let user = self.users.find_or_create(user_id);
        user.total_size += size;
    }

    /// Remove an allocation's size from the instance and the owning user.
    /// Underflow indicates an accounting bug; it is clamped and logged.
    pub fn remove_user_load(&mut self, user_id: UserId, size: u32, job_id: u32) {
        if self.used_space >= size {
            self.used_space -= size;
        } else {
            error!("used space underflow releasing buffer for job {}", job_id);
            self.used_space = 0;
        }

        let user = self.users.find_or_create(user_id);
        if user.total_size >= size {
            user.total_size -= size;
        } else {
            error!("user {} table underflow", user_id);
            user.total_size = 0;
        }
    }

    /// Allocate a buffer for a job, account its load, and raise the job's
    /// priority when a use-time boost is configured. The boost only ever
    /// lowers nice, never raises it.
    pub fn alloc_job(&mut self, job: &mut JobRecord, size: u32) {
        let boost = self.config.prio_boost_use;
        if boost > 0 {
            let new_nice = crate::core::limits::NICE_OFFSET - boost;
            if new_nice < job.nice {
                let new_prio = job.priority as i64 + job.nice as i64 - new_nice as i64;
                job.priority = new_prio.max(0) as u32;
                job.nice = new_nice;
                info!(
                    "Uses burst buffer, reset priority to {} for job_id {}",
                    job.priority, job.job_id
                );
            }
        }

        self.alloc_job_rec(job, size);
        self.add_user_load(job.user_id, size);
    }
}
