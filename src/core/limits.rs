/*!
 * System Limits
 * Fixed constants shared across the engine and the agent
 */

use std::time::Duration;

/// Bucket count for the allocation and user hash tables.
pub const HASH_TABLE_SIZE: u32 = 100;

/// Largest representable nice value; priority boosts are clamped to it.
pub const NICE_OFFSET: u32 = 10_000;

/// Sentinel for "no value configured" on 32-bit quantities (unlimited).
pub const NO_VAL: u32 = u32::MAX;

/// Concurrency ceiling for the parallel RPC agent's worker pool.
pub const AGENT_THREAD_COUNT: usize = 10;

/// Default per-target wall-clock deadline for agent RPCs.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Wall-clock budget for the pool inventory helper program.
pub const POOL_IMPORT_TIMEOUT: Duration = Duration::from_secs(3600);
