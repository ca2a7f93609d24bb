//! In-process accumulator used when no Redis is configured, and in tests.

use super::{parse_float, Accumulator, AccumulatorError};
use crate::clock::{Clock, SystemClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct StringEntry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    strings: HashMap<String, StringEntry>,
    hashes: HashMap<String, HashMap<String, f64>>,
    sorted_sets: HashMap<String, HashMap<String, f64>>,
}

/// Mutex-guarded maps with Redis-like semantics.
///
/// Every operation takes the lock once, so each call is atomic with respect
/// to the others. Expiry is evaluated lazily against the injected clock.
#[derive(Debug)]
pub struct InMemoryAccumulator {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
}

impl InMemoryAccumulator {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drop `key` if its TTL has passed.
    fn evict_expired(&self, state: &mut State, key: &str) {
        let now = self.clock.now();
        let expired = state
            .strings
            .get(key)
            .and_then(|entry| entry.expires_at)
            .is_some_and(|at| at <= now);
        if expired {
            state.strings.remove(key);
        }
    }
}

impl Default for InMemoryAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Accumulator for InMemoryAccumulator {
    async fn incr_float(&self, key: &str, delta: f64) -> Result<f64, AccumulatorError> {
        let mut state = self.lock();
        self.evict_expired(&mut state, key);

        let entry = state
            .strings
            .entry(key.to_string())
            .or_insert_with(|| StringEntry {
                value: "0".to_string(),
                expires_at: None,
            });
        let next = parse_float(key, &entry.value)? + delta;
        entry.value = next.to_string();
        Ok(next)
    }

    async fn hincr_float(
        &self,
        hash: &str,
        field: &str,
        delta: f64,
    ) -> Result<f64, AccumulatorError> {
        let mut state = self.lock();
        let slot = state
            .hashes
            .entry(hash.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0.0);
        *slot += delta;
        Ok(*slot)
    }

    async fn hget_float(&self, hash: &str, field: &str) -> Result<Option<f64>, AccumulatorError> {
        let state = self.lock();
        Ok(state.hashes.get(hash).and_then(|h| h.get(field)).copied())
    }

    async fn hget_all_floats(&self, hash: &str) -> Result<HashMap<String, f64>, AccumulatorError> {
        let state = self.lock();
        Ok(state.hashes.get(hash).cloned().unwrap_or_default())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, AccumulatorError> {
        let mut state = self.lock();
        self.evict_expired(&mut state, key);
        Ok(state.strings.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), AccumulatorError> {
        let expires_at = match ttl {
            Some(ttl) => {
                let ttl = chrono::Duration::from_std(ttl)
                    .map_err(|e| AccumulatorError::Unavailable(format!("invalid ttl: {}", e)))?;
                Some(self.clock.now() + ttl)
            }
            None => None,
        };

        self.lock().strings.insert(
            key.to_string(),
            StringEntry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), AccumulatorError> {
        self.lock()
            .sorted_sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    async fn zrevrange_with_scores(
        &self,
        key: &str,
    ) -> Result<Vec<(String, f64)>, AccumulatorError> {
        let state = self.lock();
        let mut entries: Vec<(String, f64)> = state
            .sorted_sets
            .get(key)
            .map(|set| set.iter().map(|(m, s)| (m.clone(), *s)).collect())
            .unwrap_or_default();

        // Redis orders equal scores by member, reversed for ZREVRANGE
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        Ok(entries)
    }
}
