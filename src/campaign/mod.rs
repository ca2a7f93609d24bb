//! Reward aggregation and settlement engine.
//!
//! `CampaignService` owns the campaign rules. Its operations are split by
//! concern across submodules, each adding an `impl CampaignService` block:
//! - `scheduler.rs` - task roster creation and active-task lookup
//! - `aggregator.rs` - per-swap volume accumulation and onboarding completion
//! - `settlement.rs` - period close-out and the timer-driven runner
//! - `queries.rs` - point histories, task status, and leaderboards

mod aggregator;
mod queries;
mod scheduler;
mod settlement;

pub use settlement::{SettlementRunner, SettlementState, SettlementSummary};

use crate::accumulator::{Accumulator, AccumulatorError};
use crate::clock::Clock;
use crate::db::TaskStore;
use crate::domain::TaskName;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

pub const ONBOARDING_TASK_DESCRIPTION: &str = "OnboardingTask";
pub const ONBOARDING_TASK_POINTS: f64 = 100.0;
/// Cumulative per-address volume in a period that completes onboarding.
pub const ONBOARDING_TARGET_AMOUNT: f64 = 1000.0;
pub const ONBOARDING_DURATION_DAYS: i64 = 28;

pub const SHARE_POOL_TASK_DESCRIPTION: &str = "SharePoolTask";
pub const SHARE_POOL_TASK_POINTS: f64 = 10_000.0;
pub const SHARE_POOL_PERIOD_DAYS: i64 = 7;
pub const SHARE_POOL_PERIODS: i32 = 4;

/// Default spacing between settlement runs.
pub const DEFAULT_SETTLEMENT_INTERVAL: Duration =
    Duration::from_secs(SHARE_POOL_PERIOD_DAYS as u64 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("{0} already exists")]
    AlreadyExists(TaskName),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("no active share pool period")]
    NoActivePeriod,
    #[error("invalid swap amount: {0}")]
    InvalidAmount(f64),
    #[error("expected {expected} task, got {actual}")]
    WrongTaskKind { expected: TaskName, actual: TaskName },
    #[error("task store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error(transparent)]
    Accumulator(#[from] AccumulatorError),
}

/// The campaign engine. Cheap to share behind an `Arc`.
pub struct CampaignService {
    store: Arc<dyn TaskStore>,
    accumulator: Arc<dyn Accumulator>,
    clock: Arc<dyn Clock>,
    settlement_interval: Duration,
    /// Serializes roster creation so the existence checks and inserts run as one step.
    start_lock: Mutex<()>,
}

impl CampaignService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        accumulator: Arc<dyn Accumulator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            accumulator,
            clock,
            settlement_interval: DEFAULT_SETTLEMENT_INTERVAL,
            start_lock: Mutex::new(()),
        }
    }

    pub fn with_settlement_interval(mut self, interval: Duration) -> Self {
        self.settlement_interval = interval;
        self
    }

    pub fn settlement_interval(&self) -> Duration {
        self.settlement_interval
    }

    /// True once the onboarding task has been created.
    pub async fn campaign_started(&self) -> Result<bool, CampaignError> {
        Ok(self.store.task_exists_by_name(TaskName::Onboarding).await?)
    }

    /// Create the task roster and launch the detached settlement runner.
    ///
    /// The runner's first tick lands one settlement interval after now. Only
    /// the start that creates the roster spawns a runner.
    pub async fn start_campaign(self: &Arc<Self>) -> Result<(), CampaignError> {
        let _guard = self.start_lock.lock().await;
        let share_pool_tasks = self.insert_campaign_tasks().await?;
        SettlementRunner::new(self.clone(), share_pool_tasks).spawn(self.settlement_interval);
        Ok(())
    }
}
