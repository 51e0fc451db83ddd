/*!
 * Allocation Tables
 * Bucketed hash tables for allocation and per-user records, keyed by
 * user id modulo a fixed bucket count
 */

use crate::config::GresClass;
use crate::core::limits::HASH_TABLE_SIZE;
use crate::core::types::{JobId, JobRecord, Timestamp, UserId};
use log::error;

/// Lifecycle of one burst buffer allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u16)]
pub enum AllocState {
    #[default]
    Allocated = 1,
    StagingIn = 2,
    StagedIn = 3,
    Running = 4,
    StagingOut = 5,
    StagedOut = 6,
    Complete = 7,
}

impl AllocState {
    #[inline]
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Allocated),
            2 => Some(Self::StagingIn),
            3 => Some(Self::StagedIn),
            4 => Some(Self::Running),
            5 => Some(Self::StagingOut),
            6 => Some(Self::StagedOut),
            7 => Some(Self::Complete),
            _ => None,
        }
    }

    /// True while data is being or has been staged toward the compute phase.
    #[inline]
    #[must_use]
    pub fn is_staging_in(self) -> bool {
        matches!(self, Self::StagingIn | Self::StagedIn)
    }
}

/// One burst buffer allocation.
///
/// `job_id` of 0 marks a named allocation that is not bound to a job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BbAlloc {
    pub user_id: UserId,
    pub job_id: JobId,
    pub name: Option<String>,
    pub array_job_id: u32,
    pub array_task_id: u32,
    /// Size in granularity units.
    pub size: u32,
    pub state: AllocState,
    /// Time of the last state change.
    pub state_time: Timestamp,
    /// Last confirmation from the real system.
    pub seen_time: Timestamp,
    /// Predicted start of use.
    pub use_time: Timestamp,
    /// Predicted end of use, 0 while undetermined.
    pub end_time: Timestamp,
    pub gres: Vec<GresClass>,
}

/// Per-user aggregate load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BbUser {
    pub user_id: UserId,
    pub total_size: u32,
}

#[inline]
fn bucket_of(user_id: UserId) -> usize {
    (user_id % HASH_TABLE_SIZE) as usize
}

/// Allocation records bucketed by owner id; collisions share a bucket and
/// are walked in insertion order, newest first.
#[derive(Debug, Clone)]
pub struct AllocTable {
    buckets: Vec<Vec<BbAlloc>>,
}

impl Default for AllocTable {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: (0..HASH_TABLE_SIZE).map(|_| Vec::new()).collect(),
        }
    }

    /// Insert at the bucket head and return the stored record.
    pub fn insert(&mut self, alloc: BbAlloc) -> &mut BbAlloc {
        let bucket = &mut self.buckets[bucket_of(alloc.user_id)];
        bucket.insert(0, alloc);
        &mut bucket[0]
    }

    /// Find the allocation bound to `job`.
    ///
    /// A record with the right job id but the wrong owner means the
    /// controller's recovered job state disagrees with the buffer state;
    /// the mismatch is logged and the walk continues.
    #[must_use]
    pub fn find_job(&self, job: &JobRecord) -> Option<&BbAlloc> {
        self.buckets[bucket_of(job.user_id)]
            .iter()
            .find(|alloc| Self::job_matches(alloc, job))
    }

    pub fn find_job_mut(&mut self, job: &JobRecord) -> Option<&mut BbAlloc> {
        self.buckets[bucket_of(job.user_id)]
            .iter_mut()
            .find(|alloc| Self::job_matches(alloc, job))
    }

    /// Remove and return the allocation bound to `job`.
    pub fn remove_job(&mut self, job: &JobRecord) -> Option<BbAlloc> {
        let bucket = &mut self.buckets[bucket_of(job.user_id)];
        let index = bucket
            .iter()
            .position(|alloc| Self::job_matches(alloc, job))?;
        Some(bucket.remove(index))
    }

    fn job_matches(alloc: &BbAlloc, job: &JobRecord) -> bool {
        if alloc.job_id != job.job_id {
            return false;
        }
        if alloc.user_id == job.user_id {
            return true;
        }
        error!(
            "controller state inconsistent with burst buffer. JobID {} has UserID mismatch ({} != {})",
            job.job_id, alloc.user_id, job.user_id
        );
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &BbAlloc> {
        self.buckets.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut BbAlloc> {
        self.buckets.iter_mut().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}

/// At most one record per user that has ever held an allocation.
#[derive(Debug, Clone)]
pub struct UserTable {
    buckets: Vec<Vec<BbUser>>,
}

impl Default for UserTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UserTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: (0..HASH_TABLE_SIZE).map(|_| Vec::new()).collect(),
        }
    }

    /// Return the user's record, creating a zeroed one at the bucket head
    /// on first reference.
    pub fn find_or_create(&mut self, user_id: UserId) -> &mut BbUser {
        let bucket = &mut self.buckets[bucket_of(user_id)];
        match bucket.iter().position(|u| u.user_id == user_id) {
            Some(index) => &mut bucket[index],
            None => {
                bucket.insert(
                    0,
                    BbUser {
                        user_id,
                        total_size: 0,
                    },
                );
                &mut bucket[0]
            }
        }
    }

    #[must_use]
    pub fn get(&self, user_id: UserId) -> Option<&BbUser> {
        self.buckets[bucket_of(user_id)]
            .iter()
            .find(|u| u.user_id == user_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BbUser> {
        self.buckets.iter().flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }
}
