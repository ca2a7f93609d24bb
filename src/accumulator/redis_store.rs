//! Redis-backed accumulator.

use super::{parse_float, Accumulator, AccumulatorError};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Accumulator over a shared Redis instance.
///
/// Every key is namespaced with `prefix`. The connection manager reconnects
/// on its own, so a transient outage surfaces as `Unavailable` on the calls
/// made during it.
#[derive(Clone)]
pub struct RedisAccumulator {
    conn: ConnectionManager,
    prefix: String,
}

impl fmt::Debug for RedisAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisAccumulator")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl From<redis::RedisError> for AccumulatorError {
    fn from(err: redis::RedisError) -> Self {
        AccumulatorError::Unavailable(err.to_string())
    }
}

impl RedisAccumulator {
    /// Connect to `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, AccumulatorError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        let prefix = prefix.into();

        info!(prefix = %prefix, "Connected to Redis accumulator");
        Ok(Self { conn, prefix })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

/// Millisecond TTL for `SET ... PX`, which rejects zero.
fn px_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Accumulator for RedisAccumulator {
    async fn incr_float(&self, key: &str, delta: f64) -> Result<f64, AccumulatorError> {
        let mut conn = self.conn.clone();
        let raw: String = redis::cmd("INCRBYFLOAT")
            .arg(self.key(key))
            .arg(delta)
            .query_async(&mut conn)
            .await?;
        parse_float(key, &raw)
    }

    async fn hincr_float(
        &self,
        hash: &str,
        field: &str,
        delta: f64,
    ) -> Result<f64, AccumulatorError> {
        let mut conn = self.conn.clone();
        let raw: String = redis::cmd("HINCRBYFLOAT")
            .arg(self.key(hash))
            .arg(field)
            .arg(delta)
            .query_async(&mut conn)
            .await?;
        parse_float(hash, &raw)
    }

    async fn hget_float(&self, hash: &str, field: &str) -> Result<Option<f64>, AccumulatorError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("HGET")
            .arg(self.key(hash))
            .arg(field)
            .query_async(&mut conn)
            .await?;
        raw.map(|v| parse_float(hash, &v)).transpose()
    }

    async fn hget_all_floats(&self, hash: &str) -> Result<HashMap<String, f64>, AccumulatorError> {
        let mut conn = self.conn.clone();
        let raw: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.key(hash))
            .query_async(&mut conn)
            .await?;

        raw.into_iter()
            .map(|(field, value)| parse_float(hash, &value).map(|v| (field, v)))
            .collect()
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AccumulatorError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(self.key(key))
            .query_async(&mut conn)
            .await?;
        Ok(raw)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), AccumulatorError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.key(key)).arg(value);
        if let Some(ttl) = ttl {
            cmd.arg("PX").arg(px_millis(ttl));
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), AccumulatorError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("ZADD")
            .arg(self.key(key))
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
    ) -> Result<Vec<(String, f64)>, AccumulatorError> {
        let mut conn = self.conn.clone();
        let entries: Vec<(String, f64)> = redis::cmd("ZREVRANGE")
            .arg(self.key(key))
            .arg(0)
            .arg(-1)
            .arg("WITHSCORES")
            .query_async(&mut conn)
            .await?;
        Ok(entries)
    }
}
