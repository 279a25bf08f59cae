use pinion_core::{
    Event, EventSink, MigrationDayStats, Pin, PinQuery, PinRegistry, PinStatus, SECONDS_PER_DAY,
    Severity, StatsStore, unix_now,
};
use pinion_registry_redb::RedbStateStore;
use tempfile::tempdir;

fn pin(id: &str, age_days: u64) -> Pin {
    Pin::discovered(
        id.parse().unwrap(),
        Some(2048),
        unix_now() - age_days * SECONDS_PER_DAY,
    )
}

#[tokio::test]
async fn insert_if_absent_is_a_noop_on_duplicates() {
    let dir = tempdir().unwrap();
    let store = RedbStateStore::open(dir.path()).unwrap();

    assert!(store.insert_if_absent(pin("Qm123", 1)).await.unwrap());
    // Second insert with different field values must not overwrite.
    let mut changed = pin("Qm123", 9);
    changed.size_bytes = Some(1);
    assert!(!store.insert_if_absent(changed).await.unwrap());

    let stored = store.get(&"Qm123".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(stored.size_bytes, Some(2048));
    assert_eq!(stored.age_days(unix_now()), 1);
}

#[tokio::test]
async fn rows_survive_reopen() {
    let dir = tempdir().unwrap();
    {
        let store = RedbStateStore::open(dir.path()).unwrap();
        store.insert_if_absent(pin("Qm123", 3)).await.unwrap();
    }
    let store = RedbStateStore::open(dir.path()).unwrap();
    let stored = store.get(&"Qm123".parse().unwrap()).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn select_filters_sorts_and_limits() {
    let dir = tempdir().unwrap();
    let store = RedbStateStore::open(dir.path()).unwrap();

    for (id, age) in [("Qmb", 3), ("Qma", 8), ("Qmc", 6), ("Qmd", 1)] {
        let mut p = pin(id, age);
        p.mark_accepted("validated");
        store.insert_if_absent(p).await.unwrap();
    }

    let query = PinQuery::default()
        .with_status(PinStatus::Accepted)
        .with_migrated(false)
        .with_min_age_days(3)
        .with_limit(2);
    let selected = store.select(&query).await.unwrap();
    let ids: Vec<&str> = selected.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["Qma", "Qmc"]);

    // count ignores the limit
    let count = store.count(&query).await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn delete_removes_the_row() {
    let dir = tempdir().unwrap();
    let store = RedbStateStore::open(dir.path()).unwrap();

    store.insert_if_absent(pin("Qm123", 0)).await.unwrap();
    assert!(store.delete(&"Qm123".parse().unwrap()).await.unwrap());
    assert!(!store.delete(&"Qm123".parse().unwrap()).await.unwrap());
    assert!(store.get(&"Qm123".parse().unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn update_replaces_lifecycle_fields() {
    let dir = tempdir().unwrap();
    let store = RedbStateStore::open(dir.path()).unwrap();

    store.insert_if_absent(pin("Qm123", 5)).await.unwrap();
    let mut stored = store.get(&"Qm123".parse().unwrap()).await.unwrap().unwrap();
    stored.mark_accepted("validated");
    stored.mark_migrated(unix_now(), "replicated to supernode");
    store.update(stored).await.unwrap();

    let reread = store.get(&"Qm123".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(reread.status, PinStatus::Accepted);
    assert!(reread.migrated);
    assert_eq!(reread.note.as_deref(), Some("replicated to supernode"));
}

#[tokio::test]
async fn events_append_in_order() {
    let dir = tempdir().unwrap();
    let store = RedbStateStore::open(dir.path()).unwrap();

    for (i, severity) in [Severity::Info, Severity::Warning, Severity::Error]
        .into_iter()
        .enumerate()
    {
        let event = Event::new("migration.run", severity, format!("run {i}"), unix_now())
            .with("processed", i);
        store.append(event).await.unwrap();
    }

    let events = store.events().await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].message, "run 0");
    assert_eq!(events[2].severity, Severity::Error);
    assert_eq!(events[2].metadata.get("processed").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn stats_upsert_accumulates_and_prunes() {
    let dir = tempdir().unwrap();
    let store = RedbStateStore::open(dir.path()).unwrap();

    let delta = MigrationDayStats {
        runs: 1,
        processed: 2,
        succeeded: 2,
        failed: 0,
        bytes_migrated: 1000,
    };
    store.add_migration_stats("2026-08-06", delta).await.unwrap();
    store.add_migration_stats("2026-08-06", delta).await.unwrap();
    store.add_migration_stats("2026-08-07", delta).await.unwrap();

    let day = store.migration_stats("2026-08-06").await.unwrap().unwrap();
    assert_eq!(day.runs, 2);
    assert_eq!(day.bytes_migrated, 2000);

    let removed = store.prune_stats("2026-08-07").await.unwrap();
    assert_eq!(removed, 1);
    assert!(store.migration_stats("2026-08-06").await.unwrap().is_none());
    assert!(store.migration_stats("2026-08-07").await.unwrap().is_some());
}
