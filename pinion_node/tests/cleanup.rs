mod common;

use common::{Harness, id};
use pinion_core::daemon::RepoStat;
use pinion_core::{ContentId, PinRegistry, unix_now};
use pinion_node::config::CleanupConfig;

fn config() -> CleanupConfig {
    CleanupConfig {
        delete_after_days: 7,
        invalid_retention_days: 2,
        overdue_after_days: 14,
        stats_retention_days: 90,
    }
}

async fn insert_migrated(h: &Harness, cid: &ContentId, age_days: u64) {
    let mut pin = h.insert_aged(cid, age_days).await;
    pin.mark_accepted("validated");
    pin.mark_migrated(unix_now(), "replicated to supernode");
    h.store.update(pin).await.unwrap();
    h.daemon.add_pin(cid, 1024);
}

async fn insert_rejected(h: &Harness, cid: &ContentId, age_days: u64) {
    let mut pin = h.insert_aged(cid, age_days).await;
    pin.mark_rejected("not authorized");
    h.store.update(pin).await.unwrap();
}

#[tokio::test]
async fn migrated_reclaim_respects_the_retention_boundary() {
    let h = Harness::new();
    insert_migrated(&h, &id("Qmripe"), 7).await;
    let mut young = h.insert_just_under(&id("Qmfresh"), 7).await;
    young.mark_accepted("validated");
    young.mark_migrated(unix_now(), "replicated to supernode");
    h.store.update(young).await.unwrap();
    h.daemon.add_pin(&id("Qmfresh"), 1024);

    let report = h.cleanup_worker(config()).run().await.unwrap();
    assert_eq!(report.unpinned, 1);
    assert_eq!(report.bytes_freed, 1024);

    // The ripe pin keeps an audit row, now flagged unpinned.
    let ripe = h.store.get(&id("Qmripe")).await.unwrap().unwrap();
    assert!(ripe.unpinned);
    assert!(ripe.unpinned_at.is_some());
    assert!(!h.daemon.holds_pin(&id("Qmripe")));

    let fresh = h.store.get(&id("Qmfresh")).await.unwrap().unwrap();
    assert!(!fresh.unpinned);
    assert!(h.daemon.holds_pin(&id("Qmfresh")));
}

#[tokio::test]
async fn failed_removal_leaves_the_pin_for_the_next_run() {
    let h = Harness::new();
    insert_migrated(&h, &id("Qmstuck"), 8).await;
    insert_migrated(&h, &id("Qmfine"), 8).await;
    h.daemon.fail_remove(&id("Qmstuck"));

    let report = h.cleanup_worker(config()).run().await.unwrap();
    assert_eq!(report.unpinned, 1);
    assert_eq!(report.errors.len(), 1);

    // unpinned stays false, so the next run retries.
    let stuck = h.store.get(&id("Qmstuck")).await.unwrap().unwrap();
    assert!(!stuck.unpinned);
}

#[tokio::test]
async fn rejected_pins_are_purged_entirely() {
    let h = Harness::new();
    insert_rejected(&h, &id("Qmbad"), 2).await;
    insert_rejected(&h, &id("Qmrecent"), 1).await;
    // Qmbad was never locally confirmed; removal must tolerate that.

    let before = h.store.pin_count();
    let report = h.cleanup_worker(config()).run().await.unwrap();
    assert_eq!(report.rejected_purged, 1);
    assert_eq!(h.store.pin_count(), before - 1);

    // No audit row survives for rejected content.
    assert!(h.store.get(&id("Qmbad")).await.unwrap().is_none());
    assert!(h.store.get(&id("Qmrecent")).await.unwrap().is_some());
}

#[tokio::test]
async fn gc_runs_even_when_there_is_nothing_to_reclaim() {
    let h = Harness::new();
    h.daemon.push_repo_stats([
        RepoStat {
            used_bytes: 10_000,
            capacity_bytes: 100_000,
        },
        RepoStat {
            used_bytes: 4_000,
            capacity_bytes: 100_000,
        },
    ]);

    let report = h.cleanup_worker(config()).run().await.unwrap();
    assert_eq!(h.daemon.gc_runs(), 1);
    assert_eq!(report.gc_bytes_freed, 6_000);
    assert!(report.gc_error.is_none());
}

#[tokio::test]
async fn overdue_pins_raise_an_alert() {
    let h = Harness::new();
    let mut pin = h.insert_aged(&id("Qmstale"), 20).await;
    pin.mark_accepted("validated");
    h.store.update(pin).await.unwrap();

    let report = h.cleanup_worker(config()).run().await.unwrap();
    assert_eq!(report.overdue, 1);

    let sent = h.notifier.sent();
    assert!(sent.iter().any(|(subject, _)| subject == "overdue pins"));

    // Overdue is an alerting signal only; the pin itself is untouched.
    let pin = h.store.get(&id("Qmstale")).await.unwrap().unwrap();
    assert!(!pin.migrated);
    assert!(!pin.unpinned);
}
