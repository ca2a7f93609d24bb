//! Domain types for the swap campaign.
//!
//! This module provides:
//! - Domain primitives: Address, TaskName
//! - Task and TaskHistory records plus their insert payloads
//! - Derived per-address task status and leaderboard rows

pub mod primitives;
pub mod task;

pub use primitives::{Address, AddressParseError, TaskName, TaskNameParseError};
pub use task::{
    LeaderboardEntry, NewTask, NewTaskHistory, PointHistory, Task, TaskHistory, TaskStatus,
    TaskStatusView, TaskWithHistory,
};
