use super::{task_from_row, task_history_from_row, Repository};
use crate::domain::{Address, NewTaskHistory, PointHistory, TaskHistory, TaskName, TaskWithHistory};
use chrono::Utc;
use sqlx::sqlite::SqliteRow;

const JOINED_COLUMNS: &str = r#"
    t.id AS t_id, t.name AS t_name, t.description AS t_description, t.points AS t_points,
    t.started_at AS t_started_at, t.end_at AS t_end_at, t.period AS t_period,
    t.created_at AS t_created_at, t.updated_at AS t_updated_at,
    h.id AS h_id, h.address AS h_address, h.task_id AS h_task_id,
    h.reward_points AS h_reward_points, h.amount AS h_amount, h.completed_at AS h_completed_at,
    h.created_at AS h_created_at, h.updated_at AS h_updated_at
"#;

impl Repository {
    // =========================================================================
    // Task history operations
    // =========================================================================

    /// Insert a task history row.
    ///
    /// No uniqueness is enforced on `(address, task_id)`; callers that need
    /// at-most-once semantics check `query_task_history` first.
    ///
    /// # Errors
    /// Returns an error if the insert fails (e.g., unknown task id).
    pub async fn insert_task_history(
        &self,
        history: &NewTaskHistory,
    ) -> Result<TaskHistory, sqlx::Error> {
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO task_histories (address, task_id, reward_points, amount, completed_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(history.address.as_str())
        .bind(history.task_id)
        .bind(history.reward_points)
        .bind(history.amount)
        .bind(history.completed_at.map(|t| t.timestamp_millis()))
        .bind(now_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            r#"
            SELECT id, address, task_id, reward_points, amount, completed_at, created_at, updated_at
            FROM task_histories
            WHERE id = ?
            "#,
        )
        .bind(result.last_insert_rowid())
        .fetch_one(&self.pool)
        .await?;

        task_history_from_row(&row, "")?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Get the earliest history row of an address for a task.
    pub async fn query_task_history(
        &self,
        address: &Address,
        task_id: i64,
    ) -> Result<Option<TaskHistory>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT id, address, task_id, reward_points, amount, completed_at, created_at, updated_at
            FROM task_histories
            WHERE address = ? AND task_id = ?
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(address.as_str())
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => task_history_from_row(&r, ""),
            None => Ok(None),
        }
    }

    /// Count history rows of an address for a task.
    pub async fn count_task_histories(
        &self,
        address: &Address,
        task_id: i64,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM task_histories WHERE address = ? AND task_id = ?",
        )
        .bind(address.as_str())
        .bind(task_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Query every history row of an address together with its task.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row cannot be decoded.
    pub async fn query_point_histories(
        &self,
        address: &Address,
    ) -> Result<Vec<PointHistory>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {}
            FROM task_histories h
            INNER JOIN tasks t ON h.task_id = t.id
            WHERE h.address = ?
            ORDER BY h.completed_at ASC, h.id ASC
            "#,
            JOINED_COLUMNS
        );

        let rows = sqlx::query(&sql)
            .bind(address.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let task = task_from_row(row, "t_")?;
                let task_history =
                    task_history_from_row(row, "h_")?.ok_or(sqlx::Error::RowNotFound)?;
                Ok(PointHistory { task, task_history })
            })
            .collect()
    }

    /// Query tasks by name left-joined with the address's history rows.
    ///
    /// A task the address has no history for appears once with `history: None`.
    pub async fn query_tasks_with_histories(
        &self,
        address: &Address,
        names: &[TaskName],
    ) -> Result<Vec<TaskWithHistory>, sqlx::Error> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            r#"
            SELECT {}
            FROM tasks t
            LEFT JOIN task_histories h ON h.task_id = t.id AND h.address = ?
            WHERE t.name IN ({})
            ORDER BY t.name ASC, t.period ASC, h.id ASC
            "#,
            JOINED_COLUMNS, placeholders
        );

        let mut query = sqlx::query(&sql).bind(address.as_str());
        for name in names {
            query = query.bind(name.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(task_with_history_from_row).collect()
    }
}

fn task_with_history_from_row(row: &SqliteRow) -> Result<TaskWithHistory, sqlx::Error> {
    Ok(TaskWithHistory {
        task: task_from_row(row, "t_")?,
        history: task_history_from_row(row, "h_")?,
    })
}
