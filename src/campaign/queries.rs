use super::{CampaignError, CampaignService};
use crate::accumulator::keys::rank_key;
use crate::domain::{Address, LeaderboardEntry, PointHistory, TaskName, TaskStatusView};

impl CampaignService {
    /// Every reward granted to an address, with the task that granted it.
    pub async fn get_point_histories(
        &self,
        address: &Address,
    ) -> Result<Vec<PointHistory>, CampaignError> {
        Ok(self.store.get_point_histories(address).await?)
    }

    /// Status of every campaign task for an address, evaluated at the current time.
    pub async fn get_task_status(
        &self,
        address: &Address,
    ) -> Result<Vec<TaskStatusView>, CampaignError> {
        let rows = self
            .store
            .get_tasks_with_histories(address, &[TaskName::Onboarding, TaskName::SharePool])
            .await?;

        let now = self.clock.now();
        Ok(rows
            .iter()
            .map(|row| TaskStatusView::from_task_with_history(row, now))
            .collect())
    }

    /// Settled leaderboard for a period, highest reward first.
    ///
    /// An unsettled period reads as an empty board.
    pub async fn get_leaderboard(
        &self,
        name: TaskName,
        period: i32,
    ) -> Result<Vec<LeaderboardEntry>, CampaignError> {
        let entries = self
            .accumulator
            .zrevrange_with_scores(&rank_key(name, period))
            .await?;

        Ok(entries
            .into_iter()
            .map(|(address, score)| LeaderboardEntry { address, score })
            .collect())
    }
}
