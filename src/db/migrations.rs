//! Task store initialization: connection options, pragmas and schema.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Stamped into `PRAGMA user_version` once `schema.sql` has been applied.
pub const SCHEMA_VERSION: i64 = 1;

/// Open (creating if needed) the SQLite task store and apply the schema.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!(path = %db_path, schema_version = SCHEMA_VERSION, "Task store ready");
    Ok(pool)
}

/// Apply `schema.sql` inside one transaction unless the database is already
/// at `SCHEMA_VERSION`.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let (current,): (i64,) = sqlx::query_as("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    if current >= SCHEMA_VERSION {
        debug!(current, "Task store schema up to date");
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    // PRAGMA does not take bind parameters
    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    info!(from = current, to = SCHEMA_VERSION, "Task store schema migrated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fresh_pool() -> (SqlitePool, String, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("nested")
            .join("campaign.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (pool, db_path, temp_dir)
    }

    async fn table_names(pool: &SqlitePool) -> Vec<String> {
        sqlx::query_as::<_, (String,)>(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .unwrap()
        .into_iter()
        .map(|(name,)| name)
        .collect()
    }

    #[tokio::test]
    async fn test_init_db_creates_file_and_schema() {
        let (pool, db_path, _temp) = fresh_pool().await;
        assert!(Path::new(&db_path).exists());
        assert_eq!(table_names(&pool).await, vec!["task_histories", "tasks"]);

        let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let (pool, db_path, _temp) = fresh_pool().await;
        sqlx::query(
            "INSERT INTO tasks (name, description, points, period, created_at, updated_at) VALUES ('OnboardingTask', '', 100, 1, 0, 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        let reopened = init_db(&db_path).await.unwrap();
        run_migrations(&reopened).await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(&reopened)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let (pool, _db_path, _temp) = fresh_pool().await;

        let (enabled,): (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(enabled, 1);

        let orphan = sqlx::query(
            "INSERT INTO task_histories (address, task_id, reward_points, amount, created_at, updated_at) VALUES ('0xabc', 999, 1, 1, 0, 0)",
        )
        .execute(&pool)
        .await;
        assert!(orphan.is_err());
    }

    #[tokio::test]
    async fn test_journal_mode() {
        let (pool, _db_path, _temp) = fresh_pool().await;
        let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .unwrap();
        // WAL can fall back on filesystems that lack shared memory
        assert!(matches!(mode.as_str(), "wal" | "delete"), "unexpected journal_mode: {}", mode);
    }
}
