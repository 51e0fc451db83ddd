/*!
 * State Engine Tests
 * Space accounting invariants, cache lifecycle, use-time estimation,
 * and the termination signal
 */

use burstctl::config::BbConfig;
use burstctl::core::limits::NICE_OFFSET;
use burstctl::core::traits::{EmptyJobTable, StaticJobTable};
use burstctl::core::types::{epoch_secs, JobRecord};
use burstctl::sched;
use burstctl::{AllocState, BbState};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * 60 * 60;

fn job(job_id: u32, user_id: u32) -> JobRecord {
    JobRecord::new(job_id, user_id)
}

/// Space accounting must agree at every level: instance, per-user, and
/// the records themselves.
fn assert_accounting(state: &BbState) {
    let inner = state.lock();
    let from_allocs: u32 = inner.allocs.iter().map(|a| a.size).sum();
    let from_users: u32 = inner.users.iter().map(|u| u.total_size).sum();
    assert_eq!(inner.used_space, from_allocs);
    assert_eq!(inner.used_space, from_users);
    for alloc in inner.allocs.iter() {
        assert!(inner.users.get(alloc.user_id).is_some());
    }
}

#[test]
fn test_alloc_and_release_accounting() {
    let state = BbState::new(BbConfig::default());

    let mut first = job(1, 1000);
    let mut second = job(2, 1001);
    state.alloc_job(&mut first, 10);
    assert_accounting(&state);
    state.alloc_job(&mut second, 10);
    assert_accounting(&state);
    assert_eq!(state.used_space(), 20);

    assert!(state.release_job_alloc(&first));
    assert_accounting(&state);
    assert_eq!(state.used_space(), 10);
    assert_eq!(state.user_total(1000), 0);
    assert_eq!(state.user_total(1001), 10);

    // Releasing again finds nothing and changes nothing
    assert!(!state.release_job_alloc(&first));
    assert_eq!(state.used_space(), 10);
}

#[test]
fn test_underflow_clamps_and_survives() {
    let _ = env_logger::builder().is_test(true).try_init();
    let state = BbState::new(BbConfig::default());
    let mut owner = job(1, 1000);
    state.alloc_job(&mut owner, 10);

    // Force an accounting bug: remove more than was ever added
    state.lock().remove_user_load(1000, 50, 1);
    assert_eq!(state.used_space(), 0);
    assert_eq!(state.user_total(1000), 0);
}

#[test]
fn test_clear_cache_idempotent() {
    let state = BbState::new(BbConfig::default());
    state.alloc_job(&mut job(1, 1000), 10);
    state.alloc_name("scratch", 1001);

    state.clear_cache();
    {
        let inner = state.lock();
        assert!(inner.allocs.is_empty());
        assert!(inner.users.is_empty());
    }
    assert_eq!(state.used_space(), 0);

    state.clear_cache();
    assert!(state.lock().allocs.is_empty());
}

#[test]
fn test_named_alloc_not_job_bound() {
    let state = BbState::new(BbConfig::default());
    state.alloc_name("scratch", 1000);

    let inner = state.lock();
    let alloc = inner.allocs.iter().next().unwrap();
    assert_eq!(alloc.job_id, 0);
    assert_eq!(alloc.name.as_deref(), Some("scratch"));
    assert_eq!(alloc.state, AllocState::Allocated);
    assert!(alloc.state_time > 0);
    assert_eq!(alloc.state_time, alloc.seen_time);
}

#[test]
fn test_prio_boost_lowers_nice_only() {
    let config = BbConfig {
        prio_boost_use: 10,
        ..BbConfig::default()
    };
    let state = BbState::new(config);

    // Job at the neutral nice value gets boosted
    let mut neutral = job(1, 1000);
    neutral.nice = NICE_OFFSET;
    neutral.priority = 500;
    state.alloc_job(&mut neutral, 4);
    assert_eq!(neutral.nice, NICE_OFFSET - 10);
    assert_eq!(neutral.priority, 510);

    // Job already further boosted is left alone
    let mut boosted = job(2, 1000);
    boosted.nice = NICE_OFFSET - 20;
    boosted.priority = 500;
    state.alloc_job(&mut boosted, 4);
    assert_eq!(boosted.nice, NICE_OFFSET - 20);
    assert_eq!(boosted.priority, 500);
}

#[test]
fn test_no_boost_when_unconfigured() {
    let state = BbState::new(BbConfig::default());
    let mut record = job(1, 1000);
    record.nice = NICE_OFFSET;
    record.priority = 500;
    state.alloc_job(&mut record, 4);
    assert_eq!(record.nice, NICE_OFFSET);
    assert_eq!(record.priority, 500);
}

#[test]
fn test_use_time_unknown_job_pushed_a_day_out() {
    let state = BbState::new(BbConfig::default());
    let mut record = job(7, 1000);
    state.alloc_job(&mut record, 10);
    assert!(state.set_job_alloc_state(&record, AllocState::StagingIn));

    let before = epoch_secs();
    sched::set_use_time(&state, &EmptyJobTable);
    let after = epoch_secs();

    let alloc = state.find_job_alloc(&record).unwrap();
    assert!(alloc.use_time >= before + DAY);
    assert!(alloc.use_time <= after + DAY);
}

#[test]
fn test_use_time_follows_job_start() {
    let state = BbState::new(BbConfig::default());
    let mut record = job(7, 1000);
    state.alloc_job(&mut record, 10);
    assert!(state.set_job_alloc_state(&record, AllocState::StagedIn));

    let now = epoch_secs();
    let mut jobs = StaticJobTable::new();
    let mut entry = job(7, 1000);
    entry.start_time = now + 300;
    entry.end_time = now + 900;
    jobs.insert(entry);

    sched::set_use_time(&state, &jobs);

    let alloc = state.find_job_alloc(&record).unwrap();
    assert_eq!(alloc.use_time, now + 300);
    assert_eq!(alloc.end_time, now + 900);
    // The soonest positive end time drives the release estimate
    assert_eq!(state.next_end_time(), now + 900);
}

#[test]
fn test_use_time_undetermined_start_is_an_hour_out() {
    let state = BbState::new(BbConfig::default());
    let mut record = job(7, 1000);
    state.alloc_job(&mut record, 10);
    assert!(state.set_job_alloc_state(&record, AllocState::StagingIn));

    let mut jobs = StaticJobTable::new();
    jobs.insert(job(7, 1000)); // start_time stays 0

    let before = epoch_secs();
    sched::set_use_time(&state, &jobs);
    let after = epoch_secs();

    let alloc = state.find_job_alloc(&record).unwrap();
    assert!(alloc.use_time >= before + HOUR);
    assert!(alloc.use_time <= after + HOUR);
}

#[test]
fn test_use_time_nameless_buffer_usable_now() {
    let state = BbState::new(BbConfig::default());
    state.alloc_name("scratch", 1000);

    let before = epoch_secs();
    sched::set_use_time(&state, &EmptyJobTable);
    let after = epoch_secs();

    let inner = state.lock();
    let alloc = inner.allocs.iter().next().unwrap();
    assert!(alloc.use_time >= before);
    assert!(alloc.use_time <= after);
}

#[test]
fn test_expired_end_time_drives_estimate_to_now() {
    let state = BbState::new(BbConfig::default());
    let mut record = job(7, 1000);
    state.alloc_job(&mut record, 10);
    assert!(state.set_job_alloc_state(&record, AllocState::Running));

    let now = epoch_secs();
    let mut jobs = StaticJobTable::new();
    let mut entry = job(7, 1000);
    entry.end_time = now.saturating_sub(60); // already past
    jobs.insert(entry);

    sched::set_use_time(&state, &jobs);
    assert!(state.next_end_time() <= epoch_secs());
}

#[test]
fn test_sleep_interrupted_by_termination() {
    let state = Arc::new(BbState::new(BbConfig::default()));

    let sleeper = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            let started = Instant::now();
            state.sleep_interruptible(30);
            started.elapsed()
        })
    };

    thread::sleep(Duration::from_millis(100));
    state.request_termination();

    let slept = sleeper.join().unwrap();
    assert!(slept < Duration::from_secs(5));
    assert!(state.terminating());

    // Once terminating, sleeps return immediately
    let started = Instant::now();
    state.sleep_interruptible(30);
    assert!(started.elapsed() < Duration::from_secs(1));
}
