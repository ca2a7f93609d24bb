use super::{CampaignError, CampaignService, SHARE_POOL_PERIODS};
use crate::accumulator::keys::{ledger_key, rank_key, total_key};
use crate::domain::{Address, NewTaskHistory, Task, TaskName};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{error, info, warn};

/// Outcome of closing one share-pool period.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementSummary {
    pub task_id: i64,
    pub period: i32,
    pub period_total: f64,
    /// Addresses that received a history row.
    pub settled: usize,
    /// Addresses whose history row could not be written.
    pub failed: usize,
}

impl CampaignService {
    /// Close out a share-pool period: split the task's points across the
    /// period's contributors in proportion to their volume, persist one
    /// history row per contributor, and fill the period leaderboard.
    ///
    /// There is no guard against settling the same period twice; a rerun
    /// writes a second set of history rows.
    pub async fn settle_period(&self, task: &Task) -> Result<SettlementSummary, CampaignError> {
        if task.name != TaskName::SharePool {
            return Err(CampaignError::WrongTaskKind {
                expected: TaskName::SharePool,
                actual: task.name,
            });
        }

        let mut summary = SettlementSummary {
            task_id: task.id,
            period: task.period,
            period_total: 0.0,
            settled: 0,
            failed: 0,
        };

        let total = total_key(task.name, task.period);
        let Some(period_total) = self.accumulator.get_float(&total).await? else {
            info!(period = task.period, "No volume recorded for period, nothing to settle");
            return Ok(summary);
        };
        summary.period_total = period_total;

        if period_total <= 0.0 {
            warn!(period = task.period, period_total, "Non-positive period total, skipping settlement");
            return Ok(summary);
        }

        let ledger = self
            .accumulator
            .hget_all_floats(&ledger_key(task.name, task.period))
            .await?;

        let mut contributions: Vec<(String, f64)> = ledger.into_iter().collect();
        contributions.sort_by(|a, b| a.0.cmp(&b.0));

        let leaderboard = rank_key(task.name, task.period);
        let completed_at = self.clock.now();

        for (address, amount) in contributions {
            let reward = task.points * (amount / period_total);

            let history = NewTaskHistory {
                address: Address::new(address.clone()),
                task_id: task.id,
                reward_points: reward,
                amount,
                completed_at: Some(completed_at),
            };

            if let Err(e) = self.store.create_task_history(&history).await {
                error!(address = %address, period = task.period, error = %e, "Failed to persist share pool reward");
                summary.failed += 1;
                continue;
            }
            summary.settled += 1;

            if let Err(e) = self.accumulator.zadd(&leaderboard, &address, reward).await {
                error!(address = %address, period = task.period, error = %e, "Failed to update leaderboard");
            }
        }

        info!(
            period = task.period,
            period_total,
            settled = summary.settled,
            failed = summary.failed,
            "Share pool period settled"
        );
        Ok(summary)
    }
}

/// Lifecycle of the settlement runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementState {
    Idle,
    Running { period: i32 },
    Stopped,
}

/// Settles one share-pool period per tick, up to four runs, then stops.
///
/// The run counter alone decides which period is next: a run that fails is
/// logged and never retried.
pub struct SettlementRunner {
    service: Arc<CampaignService>,
    tasks: Vec<Task>,
    runs_completed: usize,
    state: SettlementState,
}

impl SettlementRunner {
    pub const MAX_RUNS: usize = SHARE_POOL_PERIODS as usize;

    pub fn new(service: Arc<CampaignService>, mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(|t| t.period);
        Self {
            service,
            tasks,
            runs_completed: 0,
            state: SettlementState::Idle,
        }
    }

    pub fn state(&self) -> SettlementState {
        self.state
    }

    pub fn runs_completed(&self) -> usize {
        self.runs_completed
    }

    /// Handle one timer tick and return the resulting state.
    pub async fn tick(&mut self) -> SettlementState {
        if self.state == SettlementState::Stopped {
            return self.state;
        }

        let limit = Self::MAX_RUNS.min(self.tasks.len());
        if self.runs_completed >= limit {
            info!(runs = self.runs_completed, "Settlement runner reached its limit, stopping");
            self.state = SettlementState::Stopped;
            return self.state;
        }

        let task = self.tasks[self.runs_completed].clone();
        self.state = SettlementState::Running {
            period: task.period,
        };

        if let Err(e) = self.service.settle_period(&task).await {
            error!(period = task.period, error = %e, "Failed to settle share pool period");
        }

        self.runs_completed += 1;
        self.state = SettlementState::Idle;
        self.state
    }

    /// Run detached, ticking every `interval` starting one interval from now.
    pub fn spawn(mut self, interval: Duration) -> JoinHandle<()> {
        info!(interval_secs = interval.as_secs(), "Settlement runner started");
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                if self.tick().await == SettlementState::Stopped {
                    break;
                }
            }
        })
    }
}
