use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use swap_campaign::accumulator::keys::{
    CURRENT_SHARE_POOL_TASK_CACHE_KEY, ONBOARDING_TASK_CACHE_KEY,
};
use swap_campaign::campaign::{
    ONBOARDING_TASK_POINTS, SHARE_POOL_PERIODS, SHARE_POOL_TASK_POINTS,
};
use swap_campaign::db::init_db;
use swap_campaign::domain::{NewTask, Task};
use swap_campaign::{
    Accumulator, CampaignError, CampaignService, InMemoryAccumulator, ManualClock, Repository,
    TaskName, TaskStore,
};
use tempfile::TempDir;

struct Harness {
    service: Arc<CampaignService>,
    repo: Arc<Repository>,
    accumulator: Arc<InMemoryAccumulator>,
    clock: Arc<ManualClock>,
    _temp: TempDir,
}

fn campaign_start() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

async fn setup() -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");

    let repo = Arc::new(Repository::new(pool));
    let clock = Arc::new(ManualClock::new(campaign_start()));
    let accumulator = Arc::new(InMemoryAccumulator::with_clock(clock.clone()));
    let service = Arc::new(CampaignService::new(
        repo.clone(),
        accumulator.clone(),
        clock.clone(),
    ));

    Harness {
        service,
        repo,
        accumulator,
        clock,
        _temp: temp_dir,
    }
}

#[tokio::test]
async fn test_create_campaign_tasks_builds_roster() {
    let h = setup().await;

    let share_tasks = h.service.create_campaign_tasks().await.unwrap();
    assert_eq!(share_tasks.len(), SHARE_POOL_PERIODS as usize);

    let start = campaign_start();
    for (idx, task) in share_tasks.iter().enumerate() {
        let period = idx as i32 + 1;
        assert_eq!(task.name, TaskName::SharePool);
        assert_eq!(task.period, period);
        assert_eq!(task.points, SHARE_POOL_TASK_POINTS);
        assert_eq!(
            task.started_at,
            Some(start + Duration::days(7 * idx as i64))
        );
        assert_eq!(task.end_at, Some(start + Duration::days(7 * (idx as i64 + 1))));
    }

    // Contiguous, non-overlapping windows
    for pair in share_tasks.windows(2) {
        assert_eq!(pair[0].end_at, pair[1].started_at);
    }

    let onboarding = h
        .repo
        .get_tasks_by_name(TaskName::Onboarding)
        .await
        .unwrap();
    assert_eq!(onboarding.len(), 1);
    assert_eq!(onboarding[0].points, ONBOARDING_TASK_POINTS);
    assert_eq!(onboarding[0].period, 1);
    assert_eq!(onboarding[0].started_at, Some(start));
    assert_eq!(onboarding[0].end_at, Some(start + Duration::days(28)));
}

#[tokio::test]
async fn test_second_campaign_start_is_rejected_without_changes() {
    let h = setup().await;
    h.service.create_campaign_tasks().await.unwrap();

    h.clock.advance(Duration::hours(1));
    let err = h.service.create_campaign_tasks().await.unwrap_err();
    assert!(matches!(err, CampaignError::AlreadyExists(TaskName::Onboarding)));

    let share = h.repo.get_tasks_by_name(TaskName::SharePool).await.unwrap();
    assert_eq!(share.len(), 4);
    assert_eq!(share[0].started_at, Some(campaign_start()));
}

#[tokio::test]
async fn test_existing_share_pool_blocks_campaign_creation() {
    let h = setup().await;
    h.repo
        .create_task(&NewTask {
            name: TaskName::SharePool,
            description: "SharePoolTask".to_string(),
            points: 1.0,
            started_at: None,
            end_at: None,
            period: 1,
        })
        .await
        .unwrap();

    let err = h.service.create_campaign_tasks().await.unwrap_err();
    assert!(matches!(err, CampaignError::AlreadyExists(TaskName::SharePool)));

    // Nothing of the other kind was created either
    assert!(!h
        .repo
        .task_exists_by_name(TaskName::Onboarding)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_current_share_pool_task_follows_clock() {
    let h = setup().await;
    h.service.create_campaign_tasks().await.unwrap();

    for period in 1..=4 {
        let task = h.service.find_current_share_pool_task().await.unwrap();
        assert_eq!(task.period, period);

        // Mid-period lookups come from the cache and stay on the same period
        h.clock.advance(Duration::days(3));
        let cached = h.service.find_current_share_pool_task().await.unwrap();
        assert_eq!(cached, task);

        h.clock.advance(Duration::days(4));
    }

    let err = h.service.find_current_share_pool_task().await.unwrap_err();
    assert!(matches!(err, CampaignError::NotFound(_)));
}

#[tokio::test]
async fn test_no_share_pool_task_before_campaign_window() {
    let h = setup().await;
    h.service.create_campaign_tasks().await.unwrap();

    h.clock.set(campaign_start() - Duration::hours(1));
    let err = h.service.find_current_share_pool_task().await.unwrap_err();
    assert!(matches!(err, CampaignError::NotFound(_)));
}

#[tokio::test]
async fn test_task_lookups_populate_cache() {
    let h = setup().await;
    h.service.create_campaign_tasks().await.unwrap();

    let onboarding = h.service.find_onboarding_task().await.unwrap();
    let raw = h
        .accumulator
        .get(ONBOARDING_TASK_CACHE_KEY)
        .await
        .unwrap()
        .expect("onboarding task should be cached");
    let cached: Task = serde_json::from_str(&raw).unwrap();
    assert_eq!(cached, onboarding);

    let current = h.service.find_current_share_pool_task().await.unwrap();
    let raw = h
        .accumulator
        .get(CURRENT_SHARE_POOL_TASK_CACHE_KEY)
        .await
        .unwrap()
        .expect("share pool task should be cached");
    let cached: Task = serde_json::from_str(&raw).unwrap();
    assert_eq!(cached, current);

    // The cache entry lapses exactly at the period end
    h.clock.advance(Duration::days(7));
    assert!(h
        .accumulator
        .get(CURRENT_SHARE_POOL_TASK_CACHE_KEY)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_malformed_cache_entry_falls_back_to_store() {
    let h = setup().await;
    h.service.create_campaign_tasks().await.unwrap();

    h.accumulator
        .set(
            CURRENT_SHARE_POOL_TASK_CACHE_KEY,
            "{not json",
            Some(std::time::Duration::from_secs(3600)),
        )
        .await
        .unwrap();

    let task = h.service.find_current_share_pool_task().await.unwrap();
    assert_eq!(task.period, 1);
    assert_eq!(task.name, TaskName::SharePool);
}

#[tokio::test]
async fn test_onboarding_task_missing() {
    let h = setup().await;
    let err = h.service.find_onboarding_task().await.unwrap_err();
    assert!(matches!(err, CampaignError::NotFound(_)));
}

fn assert_single_winner(results: [Result<(), CampaignError>; 2]) {
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(CampaignError::AlreadyExists(_))))
        .count();
    assert_eq!((ok, rejected), (1, 1), "unexpected outcomes: {:?}", results);
}

async fn assert_single_roster(h: &Harness) {
    let onboarding = h.repo.get_tasks_by_name(TaskName::Onboarding).await.unwrap();
    assert_eq!(onboarding.len(), 1);

    let periods: Vec<i32> = h
        .repo
        .get_tasks_by_name(TaskName::SharePool)
        .await
        .unwrap()
        .iter()
        .map(|t| t.period)
        .collect();
    assert_eq!(periods, vec![1, 2, 3, 4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_task_creation_builds_one_roster() {
    for _ in 0..8 {
        let h = setup().await;
        let s1 = h.service.clone();
        let s2 = h.service.clone();

        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.create_campaign_tasks().await.map(|_| ()) }),
            tokio::spawn(async move { s2.create_campaign_tasks().await.map(|_| ()) }),
        );
        assert_single_winner([r1.unwrap(), r2.unwrap()]);
        assert_single_roster(&h).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_campaign_starts_build_one_roster() {
    for _ in 0..8 {
        let h = setup().await;
        let s1 = h.service.clone();
        let s2 = h.service.clone();

        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { s1.start_campaign().await }),
            tokio::spawn(async move { s2.start_campaign().await }),
        );
        assert_single_winner([r1.unwrap(), r2.unwrap()]);
        assert_single_roster(&h).await;
    }
}
