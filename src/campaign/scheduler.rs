use super::{
    CampaignError, CampaignService, ONBOARDING_DURATION_DAYS, ONBOARDING_TASK_DESCRIPTION,
    ONBOARDING_TASK_POINTS, SHARE_POOL_PERIODS, SHARE_POOL_PERIOD_DAYS,
    SHARE_POOL_TASK_DESCRIPTION, SHARE_POOL_TASK_POINTS,
};
use crate::accumulator::keys::{CURRENT_SHARE_POOL_TASK_CACHE_KEY, ONBOARDING_TASK_CACHE_KEY};
use crate::domain::{NewTask, Task, TaskName};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

impl CampaignService {
    /// Create the onboarding task and the four chained share-pool periods.
    ///
    /// Fails with `AlreadyExists` if either kind is already present, without
    /// touching existing rows. Rows created before a failing insert are kept.
    /// Returns the share-pool tasks ordered by period.
    ///
    /// Concurrent calls on one service are serialized; exactly one of them
    /// creates the roster.
    pub async fn create_campaign_tasks(&self) -> Result<Vec<Task>, CampaignError> {
        let _guard = self.start_lock.lock().await;
        self.insert_campaign_tasks().await
    }

    /// Roster creation proper. Callers hold `start_lock`.
    pub(super) async fn insert_campaign_tasks(&self) -> Result<Vec<Task>, CampaignError> {
        for name in [TaskName::Onboarding, TaskName::SharePool] {
            if self.store.task_exists_by_name(name).await? {
                return Err(CampaignError::AlreadyExists(name));
            }
        }

        let started_at = self.clock.now();

        let onboarding = self
            .store
            .create_task(&NewTask {
                name: TaskName::Onboarding,
                description: ONBOARDING_TASK_DESCRIPTION.to_string(),
                points: ONBOARDING_TASK_POINTS,
                started_at: Some(started_at),
                end_at: Some(started_at + Duration::days(ONBOARDING_DURATION_DAYS)),
                period: 1,
            })
            .await?;
        info!(task_id = onboarding.id, "Created onboarding task");

        let mut share_pool_tasks = Vec::with_capacity(SHARE_POOL_PERIODS as usize);
        let mut period_start = started_at;
        for period in 1..=SHARE_POOL_PERIODS {
            let period_end = period_start + Duration::days(SHARE_POOL_PERIOD_DAYS);
            let task = self
                .store
                .create_task(&NewTask {
                    name: TaskName::SharePool,
                    description: SHARE_POOL_TASK_DESCRIPTION.to_string(),
                    points: SHARE_POOL_TASK_POINTS,
                    started_at: Some(period_start),
                    end_at: Some(period_end),
                    period,
                })
                .await?;
            info!(task_id = task.id, period, "Created share pool task");

            share_pool_tasks.push(task);
            period_start = period_end;
        }

        share_pool_tasks.sort_by_key(|t| t.period);
        Ok(share_pool_tasks)
    }

    /// The onboarding task, read through the task cache.
    pub async fn find_onboarding_task(&self) -> Result<Task, CampaignError> {
        if let Some(task) = self.cached_task(ONBOARDING_TASK_CACHE_KEY).await? {
            return Ok(task);
        }

        let task = self
            .store
            .find_task_by_name(TaskName::Onboarding)
            .await?
            .ok_or_else(|| CampaignError::NotFound("onboarding task".to_string()))?;

        self.cache_task(ONBOARDING_TASK_CACHE_KEY, &task).await;
        Ok(task)
    }

    /// The share-pool period active now, read through the task cache.
    ///
    /// Returns `NotFound` before the first period and after the last.
    pub async fn find_current_share_pool_task(&self) -> Result<Task, CampaignError> {
        if let Some(task) = self.cached_task(CURRENT_SHARE_POOL_TASK_CACHE_KEY).await? {
            return Ok(task);
        }

        let now = self.clock.now();
        let task = self
            .store
            .get_tasks_by_name(TaskName::SharePool)
            .await?
            .into_iter()
            .find(|t| t.is_active_at(now))
            .ok_or_else(|| CampaignError::NotFound("active share pool task".to_string()))?;

        self.cache_task(CURRENT_SHARE_POOL_TASK_CACHE_KEY, &task).await;
        Ok(task)
    }

    /// Decode a cached snapshot. Undecodable entries count as misses.
    async fn cached_task(&self, key: &str) -> Result<Option<Task>, CampaignError> {
        let Some(raw) = self.accumulator.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<Task>(&raw) {
            Ok(task) => Ok(Some(task)),
            Err(e) => {
                warn!(key, error = %e, "Discarding malformed cached task");
                Ok(None)
            }
        }
    }

    /// Cache a task until its end. Failures only cost a future store read.
    async fn cache_task(&self, key: &str, task: &Task) {
        let Some(ttl) = ttl_until(task.end_at, self.clock.now()) else {
            debug!(key, task_id = task.id, "Task already ended, not caching");
            return;
        };

        let encoded = match serde_json::to_string(task) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode task for cache");
                return;
            }
        };

        if let Err(e) = self.accumulator.set(key, &encoded, Some(ttl)).await {
            warn!(key, error = %e, "Failed to cache task");
        }
    }
}

/// Remaining time until `end_at`, or `None` if there is none left.
fn ttl_until(end_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<std::time::Duration> {
    let remaining = end_at? - now;
    if remaining <= Duration::zero() {
        return None;
    }
    remaining.to_std().ok()
}
