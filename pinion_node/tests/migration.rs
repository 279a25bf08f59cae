mod common;

use common::{Harness, fast_migration, id};
use pinion_core::{ContentId, PinRegistry, unix_now, utc_date};

async fn insert_accepted(h: &Harness, cid: &ContentId, age_days: u64) {
    let mut pin = h.insert_aged(cid, age_days).await;
    pin.mark_accepted("validated");
    h.store.update(pin).await.unwrap();
}

#[tokio::test]
async fn eligibility_boundary_is_exact() {
    let h = Harness::new();
    insert_accepted(&h, &id("Qmold"), 4).await;
    // One second short of four days old.
    let mut young = h.insert_just_under(&id("Qmyoung"), 4).await;
    young.mark_accepted("validated");
    h.store.update(young).await.unwrap();

    let report = h.migration_worker(fast_migration(4, 20)).run().await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.succeeded, 1);

    assert!(h.store.get(&id("Qmold")).await.unwrap().unwrap().migrated);
    assert!(!h.store.get(&id("Qmyoung")).await.unwrap().unwrap().migrated);
}

#[tokio::test]
async fn pending_and_rejected_pins_are_never_selected() {
    let h = Harness::new();
    h.insert_aged(&id("Qmpending"), 10).await;
    let mut rejected = h.insert_aged(&id("Qmrejected"), 10).await;
    rejected.mark_rejected("not authorized");
    h.store.update(rejected).await.unwrap();

    let report = h.migration_worker(fast_migration(4, 20)).run().await.unwrap();
    assert_eq!(report.processed, 0);
}

#[tokio::test]
async fn already_present_content_skips_the_transfer() {
    let h = Harness::new();
    insert_accepted(&h, &id("Qm123"), 5).await;
    h.supernode.preload(&id("Qm123"));

    let report = h.migration_worker(fast_migration(4, 20)).run().await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.bytes_migrated, 0, "no redundant transfer");
    assert!(h.supernode.pin_calls().is_empty());

    let pin = h.store.get(&id("Qm123")).await.unwrap().unwrap();
    assert!(pin.migrated);
    assert_eq!(pin.note.as_deref(), Some("already present on supernode"));
}

#[tokio::test]
async fn accepted_pin_call_without_convergence_is_a_failure() {
    let h = Harness::new();
    insert_accepted(&h, &id("Qm123"), 5).await;
    h.supernode.stall(&id("Qm123"));

    let report = h.migration_worker(fast_migration(4, 20)).run().await.unwrap();
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.failed, 1);

    let pin = h.store.get(&id("Qm123")).await.unwrap().unwrap();
    assert!(!pin.migrated);
    assert_eq!(pin.retry_count, 1);
    assert!(pin.last_retry_at.is_some());
}

#[tokio::test]
async fn one_failing_pin_never_aborts_the_batch() {
    let h = Harness::new();
    // Oldest first, so the failing pin sits in the middle of the batch.
    insert_accepted(&h, &id("Qmfirst"), 9).await;
    insert_accepted(&h, &id("Qmsecond"), 8).await;
    insert_accepted(&h, &id("Qmthird"), 7).await;
    h.supernode.fail_pin(&id("Qmsecond"));

    let report = h.migration_worker(fast_migration(4, 20)).run().await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);

    assert!(h.store.get(&id("Qmfirst")).await.unwrap().unwrap().migrated);
    assert!(!h.store.get(&id("Qmsecond")).await.unwrap().unwrap().migrated);
    assert!(h.store.get(&id("Qmthird")).await.unwrap().unwrap().migrated);

    // Failures produce one aggregated alert.
    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "migration failures");
    assert!(sent[0].1.contains("Qmsecond"));
}

#[tokio::test]
async fn retries_accumulate_without_an_eligibility_cap() {
    let h = Harness::new();
    insert_accepted(&h, &id("Qmstuck"), 5).await;
    h.supernode.fail_pin(&id("Qmstuck"));

    let mut config = fast_migration(4, 20);
    config.max_retries_alert = 2;
    for _ in 0..4 {
        h.migration_worker(config.clone()).run().await.unwrap();
    }

    let pin = h.store.get(&id("Qmstuck")).await.unwrap().unwrap();
    assert_eq!(pin.retry_count, 4);

    // Still selected after crossing the alert threshold.
    let report = h.migration_worker(config).run().await.unwrap();
    assert_eq!(report.processed, 1);
    assert_eq!(report.retries_exhausted, 1);
}

#[tokio::test]
async fn batch_limit_takes_the_oldest_pins() {
    let h = Harness::new();
    insert_accepted(&h, &id("Qmnewer"), 5).await;
    insert_accepted(&h, &id("Qmoldest"), 9).await;
    insert_accepted(&h, &id("Qmmiddle"), 7).await;

    let report = h.migration_worker(fast_migration(4, 2)).run().await.unwrap();
    assert_eq!(report.processed, 2);
    assert!(h.store.get(&id("Qmoldest")).await.unwrap().unwrap().migrated);
    assert!(h.store.get(&id("Qmmiddle")).await.unwrap().unwrap().migrated);
    assert!(!h.store.get(&id("Qmnewer")).await.unwrap().unwrap().migrated);
}

#[tokio::test]
async fn run_results_roll_into_the_daily_aggregate() {
    let h = Harness::new();
    insert_accepted(&h, &id("Qmaaa"), 5).await;
    insert_accepted(&h, &id("Qmbbb"), 5).await;
    h.supernode.fail_pin(&id("Qmbbb"));

    h.migration_worker(fast_migration(4, 20)).run().await.unwrap();

    let day = h.store.migration_stats(&utc_date(unix_now())).unwrap();
    assert_eq!(day.runs, 1);
    assert_eq!(day.processed, 2);
    assert_eq!(day.succeeded, 1);
    assert_eq!(day.failed, 1);
    assert_eq!(day.bytes_migrated, 1024);
}
