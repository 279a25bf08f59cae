mod common;

use common::{Harness, id};
use pinion_core::{PinRegistry, PinStatus};

#[tokio::test]
async fn discovery_tracks_new_pins_as_pending() {
    let h = Harness::new();
    h.daemon.add_pin(&id("Qmaaa"), 100);
    h.daemon.add_pin(&id("Qmbbb"), 200);

    let report = h.discovery_worker().run().await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.added, 2);
    assert_eq!(report.known, 0);

    let pin = h.store.get(&id("Qmaaa")).await.unwrap().unwrap();
    assert_eq!(pin.status, PinStatus::Pending);
    assert!(!pin.migrated);
    assert!(!pin.unpinned);
    assert_eq!(pin.size_bytes, Some(100));
}

#[tokio::test]
async fn discovery_is_idempotent() {
    let h = Harness::new();
    h.daemon.add_pin(&id("Qmaaa"), 100);
    h.daemon.add_pin(&id("Qmbbb"), 200);

    let first = h.discovery_worker().run().await.unwrap();
    assert_eq!(first.added, 2);

    // Unchanged daemon pin set: the second run adds zero rows.
    let second = h.discovery_worker().run().await.unwrap();
    assert_eq!(second.scanned, 2);
    assert_eq!(second.added, 0);
    assert_eq!(second.known, 2);
    assert_eq!(h.store.pin_count(), 2);
}

#[tokio::test]
async fn failed_size_lookup_still_inserts_the_pin() {
    let h = Harness::new();
    h.daemon.add_pin(&id("Qmaaa"), 100);
    h.daemon.fail_stat(&id("Qmaaa"));

    let report = h.discovery_worker().run().await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.errors.len(), 1, "size lookup failure is reported");

    let pin = h.store.get(&id("Qmaaa")).await.unwrap().unwrap();
    assert_eq!(pin.size_bytes, None);
}

#[tokio::test]
async fn unreachable_daemon_abandons_the_run() {
    let h = Harness::new();
    h.daemon.add_pin(&id("Qmaaa"), 100);
    h.daemon.set_stopped(true);

    assert!(h.discovery_worker().run().await.is_err());
    // Nothing was touched.
    assert_eq!(h.store.pin_count(), 0);
}
