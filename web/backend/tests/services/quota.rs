use std::sync::Arc;

use lineupscout_web::cache::MokaStore;
use lineupscout_web::quota::QuotaLedger;

fn ledger(limit: u32) -> QuotaLedger {
    QuotaLedger::new(Arc::new(MokaStore::default()), limit)
}

#[tokio::test]
async fn spending_the_whole_budget_blocks_until_reset() {
    let quota = ledger(10);

    quota.track(4).await;
    assert!(quota.check_availability(6).await);
    assert!(!quota.check_availability(7).await);

    quota.track(6).await;
    assert_eq!(quota.remaining().await, 0);
    assert!(quota.is_exhausted().await);
    assert!(!quota.check_availability(1).await);

    quota.reset().await;
    assert_eq!(quota.remaining().await, 10);
    assert!(!quota.is_exhausted().await);
    assert!(quota.check_availability(1).await);
}

#[tokio::test]
async fn exhausted_flag_wins_over_remaining_units() {
    let quota = ledger(100);
    quota.track(5).await;

    quota.mark_exhausted().await;

    assert_eq!(quota.remaining().await, 95);
    assert!(!quota.check_availability(1).await);
    assert!(quota.should_use_graceful_degradation().await);
}

#[tokio::test]
async fn low_quota_triggers_degradation_at_ninety_percent() {
    let quota = ledger(100);

    quota.track(89).await;
    assert!(!quota.is_low().await);
    assert!(!quota.should_use_graceful_degradation().await);

    quota.track(1).await;
    assert!(quota.is_low().await);
    assert!(quota.should_use_graceful_degradation().await);
    assert!(!quota.is_exhausted().await);
}

#[tokio::test]
async fn status_reports_usage() {
    let quota = ledger(400);
    quota.track(100).await;

    let status = quota.status().await;

    assert_eq!(status.used, 100);
    assert_eq!(status.remaining, 300);
    assert_eq!(status.limit, 400);
    assert!((status.percentage_used - 25.0).abs() < f64::EPSILON);
    assert!(!status.is_exhausted);
    assert!(status.resets_at > chrono::Utc::now());
}

#[tokio::test]
async fn each_warning_threshold_fires_once() {
    let quota = ledger(100);

    assert!(quota.track(49).await.is_empty());
    assert_eq!(quota.track(1).await, vec![50]);
    assert!(quota.track(10).await.is_empty());
    assert_eq!(quota.track(31).await, vec![75, 90]);
    assert_eq!(quota.track(4).await, vec![95]);
    assert!(quota.track(4).await.is_empty());
    assert!(!quota.is_exhausted().await);
}
