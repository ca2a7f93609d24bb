//! Accumulator key layout. These names are inspected operationally; keep them stable.

use crate::domain::TaskName;

/// Cached onboarding task snapshot.
pub const ONBOARDING_TASK_CACHE_KEY: &str = "onboarding_task";

/// Cached snapshot of the share-pool period active right now.
pub const CURRENT_SHARE_POOL_TASK_CACHE_KEY: &str = "curr_shared_pool_task";

/// Per-period address ledger (hash of address -> amount).
pub fn ledger_key(name: TaskName, period: i32) -> String {
    format!("{}_{}", name.as_str(), period)
}

/// Per-period total contributed amount (scalar).
pub fn total_key(name: TaskName, period: i32) -> String {
    format!("{}_total", ledger_key(name, period))
}

/// Per-period leaderboard (sorted set of address -> reward).
pub fn rank_key(name: TaskName, period: i32) -> String {
    format!("{}_rank", ledger_key(name, period))
}
