//! Durability tests for the redb-backed stores: data written through one
//! handle is visible after the database is dropped and reopened, and both
//! stores share a single database file.

use std::sync::Arc;

use wayscribe::catalog::{Destination, DestinationCatalog, DurableCatalog};
use wayscribe::profile::{self, DurablePreferenceStore, PreferenceProfile, PreferenceStore};

fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn destination(id: &str, name: &str) -> Destination {
    Destination {
        id: id.into(),
        name: name.into(),
        lon: 7.49,
        lat: 6.44,
        city: "Enugu".into(),
        tags: vec!["history".into()],
        budget_level: Some("free".into()),
    }
}

#[test]
fn preferences_survive_reopen() {
    init_logging();
    let dir = tempfile::TempDir::new().unwrap();
    let profile = PreferenceProfile::new(vec!["history", "quiet"], vec!["crowded"]);

    {
        let store = DurablePreferenceStore::open(dir.path()).unwrap();
        store.upsert("u1", &profile).unwrap();
    }

    let store = DurablePreferenceStore::open(dir.path()).unwrap();
    assert_eq!(store.get("u1").unwrap(), Some(profile));
    assert_eq!(store.get("u2").unwrap(), None);
}

#[test]
fn upsert_after_reopen_replaces_wholesale() {
    init_logging();
    let dir = tempfile::TempDir::new().unwrap();

    {
        let store = DurablePreferenceStore::open(dir.path()).unwrap();
        store
            .upsert("u1", &PreferenceProfile::new(vec!["history"], vec![]))
            .unwrap();
    }

    let store = DurablePreferenceStore::open(dir.path()).unwrap();
    let replacement = PreferenceProfile::new(vec!["street food"], vec!["queues"]);
    store.upsert("u1", &replacement).unwrap();
    assert_eq!(store.get("u1").unwrap(), Some(replacement));
}

#[test]
fn catalog_survives_reopen() {
    init_logging();
    let dir = tempfile::TempDir::new().unwrap();

    {
        let catalog = DurableCatalog::open(dir.path()).unwrap();
        catalog.upsert(&destination("poi-1", "Old Clock Tower")).unwrap();
    }

    let catalog = DurableCatalog::open(dir.path()).unwrap();
    let found = catalog.get_by_id("poi-1").unwrap().unwrap();
    assert_eq!(found.name, "Old Clock Tower");
    assert_eq!(found.tags, vec!["history"]);
    assert_eq!(found.budget_level.as_deref(), Some("free"));
    assert_eq!(catalog.unique_budgets("Enugu").unwrap(), vec!["free"]);
}

#[test]
fn stores_share_one_database_file() {
    init_logging();
    let dir = tempfile::TempDir::new().unwrap();

    {
        let db = profile::open_database(dir.path()).unwrap();
        let store = DurablePreferenceStore::new(Arc::clone(&db));
        let catalog = DurableCatalog::new(db);

        store
            .upsert("u1", &PreferenceProfile::new(vec!["history"], vec![]))
            .unwrap();
        catalog.upsert(&destination("poi-1", "Old Clock Tower")).unwrap();
    }

    // Exactly one database file holds both tables.
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec!["wayscribe.redb"]);

    let db = profile::open_database(dir.path()).unwrap();
    let store = DurablePreferenceStore::new(Arc::clone(&db));
    let catalog = DurableCatalog::new(db);
    assert!(store.get("u1").unwrap().is_some());
    assert!(catalog.get_by_id("poi-1").unwrap().is_some());
}

#[test]
fn fresh_database_reads_empty() {
    init_logging();
    let dir = tempfile::TempDir::new().unwrap();
    let db = profile::open_database(dir.path()).unwrap();

    let store = DurablePreferenceStore::new(Arc::clone(&db));
    assert_eq!(store.get("anyone").unwrap(), None);

    let catalog = DurableCatalog::new(db);
    assert_eq!(catalog.get_by_id("poi-1").unwrap(), None);
    assert!(catalog.list_by_city("Enugu", &[], None).unwrap().is_empty());
}
