//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all task store operations.
//! Methods are organized across submodules by table:
//! - `tasks.rs` - Campaign task definitions
//! - `histories.rs` - Granted rewards and their joins with tasks

mod histories;
mod tasks;

use crate::db::store::TaskStore;
use crate::domain::{
    Address, NewTask, NewTaskHistory, PointHistory, Task, TaskHistory, TaskName, TaskWithHistory,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

#[async_trait]
impl TaskStore for Repository {
    async fn create_task(&self, task: &NewTask) -> Result<Task, sqlx::Error> {
        self.insert_task(task).await
    }

    async fn find_task_by_name(&self, name: TaskName) -> Result<Option<Task>, sqlx::Error> {
        self.query_first_task_by_name(name).await
    }

    async fn get_tasks_by_name(&self, name: TaskName) -> Result<Vec<Task>, sqlx::Error> {
        self.query_tasks_by_name(name).await
    }

    async fn task_exists_by_name(&self, name: TaskName) -> Result<bool, sqlx::Error> {
        self.exists_task_by_name(name).await
    }

    async fn create_task_history(
        &self,
        history: &NewTaskHistory,
    ) -> Result<TaskHistory, sqlx::Error> {
        self.insert_task_history(history).await
    }

    async fn find_task_history(
        &self,
        address: &Address,
        task_id: i64,
    ) -> Result<Option<TaskHistory>, sqlx::Error> {
        self.query_task_history(address, task_id).await
    }

    async fn get_point_histories(
        &self,
        address: &Address,
    ) -> Result<Vec<PointHistory>, sqlx::Error> {
        self.query_point_histories(address).await
    }

    async fn get_tasks_with_histories(
        &self,
        address: &Address,
        names: &[TaskName],
    ) -> Result<Vec<TaskWithHistory>, sqlx::Error> {
        self.query_tasks_with_histories(address, names).await
    }
}

// =========================================================================
// Row decoding shared by the submodules
// =========================================================================

fn ms_to_datetime(ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| sqlx::Error::Decode(format!("timestamp out of range: {}", ms).into()))
}

fn opt_ms_to_datetime(ms: Option<i64>) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    ms.map(ms_to_datetime).transpose()
}

/// Decode a task from columns prefixed with `prefix` (empty for plain selects).
fn task_from_row(row: &SqliteRow, prefix: &str) -> Result<Task, sqlx::Error> {
    let col = |name: &str| format!("{}{}", prefix, name);

    let name_str: String = row.try_get(col("name").as_str())?;
    let name = TaskName::from_str(&name_str).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(Task {
        id: row.try_get(col("id").as_str())?,
        name,
        description: row.try_get(col("description").as_str())?,
        points: row.try_get(col("points").as_str())?,
        started_at: opt_ms_to_datetime(row.try_get(col("started_at").as_str())?)?,
        end_at: opt_ms_to_datetime(row.try_get(col("end_at").as_str())?)?,
        period: row.try_get(col("period").as_str())?,
        created_at: ms_to_datetime(row.try_get(col("created_at").as_str())?)?,
        updated_at: ms_to_datetime(row.try_get(col("updated_at").as_str())?)?,
    })
}

/// Decode a history row from columns prefixed with `prefix`.
///
/// Returns `None` when the row came from a left join with no match.
fn task_history_from_row(
    row: &SqliteRow,
    prefix: &str,
) -> Result<Option<TaskHistory>, sqlx::Error> {
    let col = |name: &str| format!("{}{}", prefix, name);

    let id: Option<i64> = row.try_get(col("id").as_str())?;
    let Some(id) = id else {
        return Ok(None);
    };

    let address: String = row.try_get(col("address").as_str())?;
    Ok(Some(TaskHistory {
        id,
        address: Address::new(address),
        task_id: row.try_get(col("task_id").as_str())?,
        reward_points: row.try_get(col("reward_points").as_str())?,
        amount: row.try_get(col("amount").as_str())?,
        completed_at: opt_ms_to_datetime(row.try_get(col("completed_at").as_str())?)?,
        created_at: ms_to_datetime(row.try_get(col("created_at").as_str())?)?,
        updated_at: ms_to_datetime(row.try_get(col("updated_at").as_str())?)?,
    }))
}
