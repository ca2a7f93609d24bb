use super::{CampaignError, CampaignService, ONBOARDING_TARGET_AMOUNT, ONBOARDING_TASK_POINTS};
use crate::accumulator::keys::{ledger_key, total_key};
use crate::domain::{Address, NewTaskHistory};
use tracing::{debug, info};

impl CampaignService {
    /// Add one swap leg to the address's volume for the active period.
    ///
    /// Returns the address's cumulative amount for the period. The ledger and
    /// the period total are two separate atomic increments; the onboarding
    /// check that follows is not atomic with them.
    pub async fn record_volume(
        &self,
        address: &Address,
        amount: f64,
    ) -> Result<f64, CampaignError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(CampaignError::InvalidAmount(amount));
        }

        let task = match self.find_current_share_pool_task().await {
            Ok(task) => task,
            Err(CampaignError::NotFound(_)) => return Err(CampaignError::NoActivePeriod),
            Err(e) => return Err(e),
        };

        let ledger = ledger_key(task.name, task.period);

        // A ledger entry must imply a positive contribution
        if amount == 0.0 {
            let current = self
                .accumulator
                .hget_float(&ledger, address.as_str())
                .await?;
            return Ok(current.unwrap_or(0.0));
        }

        let cumulative = self
            .accumulator
            .hincr_float(&ledger, address.as_str(), amount)
            .await?;
        self.accumulator
            .incr_float(&total_key(task.name, task.period), amount)
            .await?;

        debug!(
            address = %address,
            period = task.period,
            amount,
            cumulative,
            "Recorded swap volume"
        );

        if cumulative >= ONBOARDING_TARGET_AMOUNT {
            self.complete_onboarding(address, cumulative).await?;
        }

        Ok(cumulative)
    }

    /// Grant the onboarding reward once per address.
    ///
    /// Two concurrent crossings can both miss the existence check and insert
    /// twice; there is no uniqueness constraint behind it.
    async fn complete_onboarding(
        &self,
        address: &Address,
        cumulative: f64,
    ) -> Result<(), CampaignError> {
        let onboarding = self.find_onboarding_task().await?;

        if self
            .store
            .find_task_history(address, onboarding.id)
            .await?
            .is_some()
        {
            return Ok(());
        }

        self.store
            .create_task_history(&NewTaskHistory {
                address: address.clone(),
                task_id: onboarding.id,
                reward_points: ONBOARDING_TASK_POINTS,
                amount: cumulative,
                completed_at: Some(self.clock.now()),
            })
            .await?;

        info!(address = %address, amount = cumulative, "Onboarding task completed");
        Ok(())
    }
}
