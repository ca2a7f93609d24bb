//! Accumulator store: live per-period counters, task cache, and leaderboards.
//!
//! The engine talks to the store through the `Accumulator` trait. Single
//! operations are atomic; sequences of operations are not.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod keys;
pub mod memory;
pub mod redis_store;

pub use memory::InMemoryAccumulator;
pub use redis_store::RedisAccumulator;

/// Key-value, hash, and sorted-set operations used by the campaign engine.
#[async_trait]
pub trait Accumulator: Send + Sync + fmt::Debug {
    /// Atomically add `delta` to a scalar counter, returning the new value.
    async fn incr_float(&self, key: &str, delta: f64) -> Result<f64, AccumulatorError>;

    /// Atomically add `delta` to a hash field, returning the new value.
    async fn hincr_float(
        &self,
        hash: &str,
        field: &str,
        delta: f64,
    ) -> Result<f64, AccumulatorError>;

    async fn hget_float(&self, hash: &str, field: &str) -> Result<Option<f64>, AccumulatorError>;

    /// Read a whole hash. A missing hash reads as empty.
    async fn hget_all_floats(&self, hash: &str) -> Result<HashMap<String, f64>, AccumulatorError>;

    async fn get(&self, key: &str) -> Result<Option<String>, AccumulatorError>;

    /// Store a string value, expiring after `ttl` when given.
    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), AccumulatorError>;

    /// Insert or update a sorted-set member.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), AccumulatorError>;

    /// Full sorted set, highest score first. A missing set reads as empty.
    async fn zrevrange_with_scores(
        &self,
        key: &str,
    ) -> Result<Vec<(String, f64)>, AccumulatorError>;

    /// Read a scalar counter written by `incr_float`.
    async fn get_float(&self, key: &str) -> Result<Option<f64>, AccumulatorError> {
        match self.get(key).await? {
            Some(raw) => parse_float(key, &raw).map(Some),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Error)]
pub enum AccumulatorError {
    #[error("accumulator store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed value at {key}: {value:?}")]
    Malformed { key: String, value: String },
}

pub(crate) fn parse_float(key: &str, raw: &str) -> Result<f64, AccumulatorError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| AccumulatorError::Malformed {
            key: key.to_string(),
            value: raw.to_string(),
        })
}
