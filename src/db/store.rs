//! Task store abstraction used by the campaign engine.

use crate::domain::{
    Address, NewTask, NewTaskHistory, PointHistory, Task, TaskHistory, TaskName, TaskWithHistory,
};
use async_trait::async_trait;

/// Durable storage for tasks and granted rewards.
///
/// `Repository` is the SQLite implementation. The engine only depends on
/// this trait so tests can inject stores that fail on demand.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, task: &NewTask) -> Result<Task, sqlx::Error>;

    /// First task with the given name, if any.
    async fn find_task_by_name(&self, name: TaskName) -> Result<Option<Task>, sqlx::Error>;

    /// All tasks with the given name, ordered by period.
    async fn get_tasks_by_name(&self, name: TaskName) -> Result<Vec<Task>, sqlx::Error>;

    async fn task_exists_by_name(&self, name: TaskName) -> Result<bool, sqlx::Error>;

    async fn create_task_history(
        &self,
        history: &NewTaskHistory,
    ) -> Result<TaskHistory, sqlx::Error>;

    async fn find_task_history(
        &self,
        address: &Address,
        task_id: i64,
    ) -> Result<Option<TaskHistory>, sqlx::Error>;

    /// Every history row of an address joined with its task.
    async fn get_point_histories(&self, address: &Address)
        -> Result<Vec<PointHistory>, sqlx::Error>;

    /// Every task with one of `names`, left-joined with the address's history rows.
    async fn get_tasks_with_histories(
        &self,
        address: &Address,
        names: &[TaskName],
    ) -> Result<Vec<TaskWithHistory>, sqlx::Error>;
}
