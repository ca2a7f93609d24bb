//! Campaign task definitions, granted rewards, and derived status views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::primitives::{Address, TaskName};

/// A campaign task or share-pool period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub name: TaskName,
    pub description: String,
    pub points: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub period: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// True when `now` falls in `[started_at, end_at)`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        match (self.started_at, self.end_at) {
            (Some(start), Some(end)) => start <= now && now < end,
            _ => false,
        }
    }
}

/// Insert payload for a task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub name: TaskName,
    pub description: String,
    pub points: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub period: i32,
}

/// A reward granted to an address for a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskHistory {
    pub id: i64,
    pub address: Address,
    pub task_id: i64,
    pub reward_points: f64,
    pub amount: f64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for a task history row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTaskHistory {
    pub address: Address,
    pub task_id: i64,
    pub reward_points: f64,
    pub amount: f64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A history row paired with the task that granted it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PointHistory {
    pub task: Task,
    pub task_history: TaskHistory,
}

/// A task with the address's history row, if it has one.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskWithHistory {
    pub task: Task,
    pub history: Option<TaskHistory>,
}

/// Lifecycle status of a task relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl TaskStatus {
    /// Derive status from the task window.
    ///
    /// A task without a start, or starting in the future, has not started.
    /// A started task without an end stays in progress.
    pub fn derive(
        started_at: Option<DateTime<Utc>>,
        end_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        match (started_at, end_at) {
            (None, _) => TaskStatus::NotStarted,
            (Some(start), _) if start > now => TaskStatus::NotStarted,
            (Some(_), None) => TaskStatus::InProgress,
            (Some(_), Some(end)) if now < end => TaskStatus::InProgress,
            _ => TaskStatus::Completed,
        }
    }
}

/// Per-address task status as returned to API callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusView {
    pub task_name: TaskName,
    pub started_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub period: i32,
    pub status: TaskStatus,
    pub is_completed: bool,
    pub reward_points: f64,
    pub amount: f64,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskStatusView {
    pub fn from_task_with_history(row: &TaskWithHistory, now: DateTime<Utc>) -> Self {
        let task = &row.task;
        let history = row.history.as_ref();

        Self {
            task_name: task.name,
            started_at: task.started_at,
            end_at: task.end_at,
            period: task.period,
            status: TaskStatus::derive(task.started_at, task.end_at, now),
            is_completed: history.is_some(),
            reward_points: history.map(|h| h.reward_points).unwrap_or(0.0),
            amount: history.map(|h| h.amount).unwrap_or(0.0),
            completed_at: history.and_then(|h| h.completed_at),
        }
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub address: String,
    pub score: f64,
}
