use super::{task_from_row, Repository};
use crate::domain::{NewTask, Task, TaskName};
use chrono::Utc;
use sqlx::Row;

impl Repository {
    // =========================================================================
    // Task operations
    // =========================================================================

    /// Insert a task and return it with its assigned id.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_task(&self, task: &NewTask) -> Result<Task, sqlx::Error> {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (name, description, points, started_at, end_at, period, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.name.as_str())
        .bind(task.description.as_str())
        .bind(task.points)
        .bind(task.started_at.map(|t| t.timestamp_millis()))
        .bind(task.end_at.map(|t| t.timestamp_millis()))
        .bind(task.period)
        .bind(now_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        self.query_task_by_id(result.last_insert_rowid())
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Get a task by id.
    pub async fn query_task_by_id(&self, id: i64) -> Result<Option<Task>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, points, started_at, end_at, period, created_at, updated_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| task_from_row(&r, "")).transpose()
    }

    /// Get the lowest-period task with the given name.
    pub async fn query_first_task_by_name(
        &self,
        name: TaskName,
    ) -> Result<Option<Task>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, points, started_at, end_at, period, created_at, updated_at
            FROM tasks
            WHERE name = ?
            ORDER BY period ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| task_from_row(&r, "")).transpose()
    }

    /// Query all tasks with the given name, ordered by period.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn query_tasks_by_name(&self, name: TaskName) -> Result<Vec<Task>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, points, started_at, end_at, period, created_at, updated_at
            FROM tasks
            WHERE name = ?
            ORDER BY period ASC, id ASC
            "#,
        )
        .bind(name.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|r| task_from_row(r, "")).collect()
    }

    pub async fn exists_task_by_name(&self, name: TaskName) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM tasks WHERE name = ? LIMIT 1) AS present")
            .bind(name.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get::<i64, _>("present")? != 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::migrations::init_db;
    use crate::db::Repository;
    use crate::domain::{NewTask, TaskName};
    use chrono::{DateTime, Duration, Utc};
    use tempfile::TempDir;

    async fn setup_repo() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn share_pool_task(period: i32, start: DateTime<Utc>) -> NewTask {
        NewTask {
            name: TaskName::SharePool,
            description: "SharePoolTask".to_string(),
            points: 10_000.0,
            started_at: Some(start),
            end_at: Some(start + Duration::days(7)),
            period,
        }
    }

    fn start() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    #[tokio::test]
    async fn test_insert_task_assigns_id_and_keeps_fields() {
        let (repo, _temp) = setup_repo().await;

        let created = repo.insert_task(&share_pool_task(2, start())).await.unwrap();
        assert!(created.id > 0);
        assert_eq!(created.name, TaskName::SharePool);
        assert_eq!(created.period, 2);
        assert_eq!(created.points, 10_000.0);
        assert_eq!(created.started_at, Some(start()));
        assert_eq!(created.end_at, Some(start() + Duration::days(7)));
    }

    #[tokio::test]
    async fn test_tasks_by_name_ordered_by_period() {
        let (repo, _temp) = setup_repo().await;

        for period in [3, 1, 2] {
            repo.insert_task(&share_pool_task(period, start())).await.unwrap();
        }

        let tasks = repo.query_tasks_by_name(TaskName::SharePool).await.unwrap();
        let periods: Vec<i32> = tasks.iter().map(|t| t.period).collect();
        assert_eq!(periods, vec![1, 2, 3]);

        let first = repo
            .query_first_task_by_name(TaskName::SharePool)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.period, 1);
    }

    #[tokio::test]
    async fn test_exists_and_missing_by_name() {
        let (repo, _temp) = setup_repo().await;

        assert!(!repo.exists_task_by_name(TaskName::Onboarding).await.unwrap());
        assert!(repo
            .query_first_task_by_name(TaskName::Onboarding)
            .await
            .unwrap()
            .is_none());

        repo.insert_task(&NewTask {
            name: TaskName::Onboarding,
            description: "OnboardingTask".to_string(),
            points: 100.0,
            started_at: None,
            end_at: None,
            period: 1,
        })
        .await
        .unwrap();

        assert!(repo.exists_task_by_name(TaskName::Onboarding).await.unwrap());
        assert!(!repo.exists_task_by_name(TaskName::SharePool).await.unwrap());
    }
}
