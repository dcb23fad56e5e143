//! Destination catalog: the point-of-interest records journeys resolve against.
//!
//! The engine only consumes this collaborator (resolve an opaque id to a name
//! and coordinates); the catalog content is loaded by external tooling. The
//! city/tag/budget filters and the unique-facet queries exist for presentation
//! layers that list candidate destinations.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, StoreError};

/// Table of destination documents: destination id → JSON document bytes.
const DESTINATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("destinations");

/// One destination record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    /// Longitude, then latitude — the order the routing collaborator uses.
    pub lon: f64,
    pub lat: f64,
    pub city: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Cost bracket (`free`, `low`, `medium`, `high`). `None` when untyped.
    #[serde(default)]
    pub budget_level: Option<String>,
}

/// Lookup interface for destination records.
pub trait DestinationCatalog: Send + Sync {
    /// Resolve a destination by id. `Ok(None)` when unknown.
    fn get_by_id(&self, id: &str) -> Result<Option<Destination>, CatalogError>;

    /// List destinations in a city, optionally requiring all given tags and a
    /// budget level. `budget: None` matches every bracket.
    fn list_by_city(
        &self,
        city: &str,
        tags: &[String],
        budget: Option<&str>,
    ) -> Result<Vec<Destination>, CatalogError>;

    /// All distinct tags across a city's destinations, sorted.
    fn unique_tags(&self, city: &str) -> Result<Vec<String>, CatalogError>;

    /// All distinct budget levels across a city's destinations, ordered
    /// cheapest first.
    fn unique_budgets(&self, city: &str) -> Result<Vec<String>, CatalogError>;

    /// Insert or replace a destination record.
    fn upsert(&self, destination: &Destination) -> Result<(), CatalogError>;
}

fn budget_rank(level: &str) -> u8 {
    match level {
        "free" => 0,
        "low" => 1,
        "medium" => 2,
        "high" => 3,
        _ => 99,
    }
}

fn filter_destinations(
    all: Vec<Destination>,
    city: &str,
    tags: &[String],
    budget: Option<&str>,
) -> Vec<Destination> {
    let mut matches: Vec<Destination> = all
        .into_iter()
        .filter(|d| d.city.eq_ignore_ascii_case(city))
        .filter(|d| tags.iter().all(|t| d.tags.iter().any(|dt| dt == t)))
        .filter(|d| budget.is_none_or(|b| d.budget_level.as_deref() == Some(b)))
        .collect();
    matches.sort_by(|a, b| a.name.cmp(&b.name));
    matches
}

fn collect_unique_tags(all: Vec<Destination>, city: &str) -> Vec<String> {
    let tags: BTreeSet<String> = all
        .into_iter()
        .filter(|d| d.city.eq_ignore_ascii_case(city))
        .flat_map(|d| d.tags)
        .collect();
    tags.into_iter().collect()
}

fn collect_unique_budgets(all: Vec<Destination>, city: &str) -> Vec<String> {
    let budgets: BTreeSet<String> = all
        .into_iter()
        .filter(|d| d.city.eq_ignore_ascii_case(city))
        .filter_map(|d| d.budget_level)
        .collect();
    let mut out: Vec<String> = budgets.into_iter().collect();
    out.sort_by_key(|b| (budget_rank(b), b.clone()));
    out
}

/// Durable catalog backed by the shared redb database.
pub struct DurableCatalog {
    db: Arc<Database>,
}

impl DurableCatalog {
    /// Open against a shared database handle.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Open or create a standalone catalog in the given directory.
    pub fn open(data_dir: &Path) -> Result<Self, CatalogError> {
        Ok(Self::new(crate::profile::open_database(data_dir)?))
    }

    fn read_all(&self) -> Result<Vec<Destination>, CatalogError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(DESTINATIONS_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                }
                .into());
            }
        };
        let mut out = Vec::new();
        let iter = table.iter().map_err(|e| StoreError::Redb {
            message: format!("iter failed: {e}"),
        })?;
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Redb {
                message: format!("range item failed: {e}"),
            })?;
            let destination: Destination =
                serde_json::from_slice(value.value()).map_err(|e| StoreError::Serialization {
                    message: format!("destination document for {}: {e}", key.value()),
                })?;
            out.push(destination);
        }
        Ok(out)
    }
}

impl DestinationCatalog for DurableCatalog {
    fn get_by_id(&self, id: &str) -> Result<Option<Destination>, CatalogError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(DESTINATIONS_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => {
                return Err(StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                }
                .into());
            }
        };
        let Some(guard) = table.get(id).map_err(|e| StoreError::Redb {
            message: format!("get failed: {e}"),
        })?
        else {
            return Ok(None);
        };
        let destination: Destination =
            serde_json::from_slice(guard.value()).map_err(|e| StoreError::Serialization {
                message: format!("destination document for {id}: {e}"),
            })?;
        Ok(Some(destination))
    }

    fn list_by_city(
        &self,
        city: &str,
        tags: &[String],
        budget: Option<&str>,
    ) -> Result<Vec<Destination>, CatalogError> {
        Ok(filter_destinations(self.read_all()?, city, tags, budget))
    }

    fn unique_tags(&self, city: &str) -> Result<Vec<String>, CatalogError> {
        Ok(collect_unique_tags(self.read_all()?, city))
    }

    fn unique_budgets(&self, city: &str) -> Result<Vec<String>, CatalogError> {
        Ok(collect_unique_budgets(self.read_all()?, city))
    }

    fn upsert(&self, destination: &Destination) -> Result<(), CatalogError> {
        let bytes = serde_json::to_vec(destination).map_err(|e| StoreError::Serialization {
            message: format!("destination document for {}: {e}", destination.id),
        })?;

        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn
                .open_table(DESTINATIONS_TABLE)
                .map_err(|e| StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                })?;
            table
                .insert(destination.id.as_str(), bytes.as_slice())
                .map_err(|e| StoreError::Redb {
                    message: format!("insert failed: {e}"),
                })?;
        }
        txn.commit().map_err(|e| StoreError::Redb {
            message: format!("commit failed: {e}"),
        })?;
        Ok(())
    }
}

impl std::fmt::Debug for DurableCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableCatalog").finish()
    }
}

/// In-memory catalog for tests and memory-only deployments.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    destinations: DashMap<String, Destination>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor from a record list.
    pub fn with_destinations(destinations: impl IntoIterator<Item = Destination>) -> Self {
        let catalog = Self::new();
        for d in destinations {
            catalog.destinations.insert(d.id.clone(), d);
        }
        catalog
    }

    fn all(&self) -> Vec<Destination> {
        self.destinations
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl DestinationCatalog for MemoryCatalog {
    fn get_by_id(&self, id: &str) -> Result<Option<Destination>, CatalogError> {
        Ok(self.destinations.get(id).map(|d| d.value().clone()))
    }

    fn list_by_city(
        &self,
        city: &str,
        tags: &[String],
        budget: Option<&str>,
    ) -> Result<Vec<Destination>, CatalogError> {
        Ok(filter_destinations(self.all(), city, tags, budget))
    }

    fn unique_tags(&self, city: &str) -> Result<Vec<String>, CatalogError> {
        Ok(collect_unique_tags(self.all(), city))
    }

    fn unique_budgets(&self, city: &str) -> Result<Vec<String>, CatalogError> {
        Ok(collect_unique_budgets(self.all(), city))
    }

    fn upsert(&self, destination: &Destination) -> Result<(), CatalogError> {
        self.destinations
            .insert(destination.id.clone(), destination.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn destination(id: &str, name: &str, city: &str, tags: &[&str]) -> Destination {
        Destination {
            id: id.into(),
            name: name.into(),
            lon: 7.49,
            lat: 6.44,
            city: city.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            budget_level: None,
        }
    }

    fn budgeted(id: &str, name: &str, city: &str, budget: &str) -> Destination {
        Destination {
            budget_level: Some(budget.into()),
            ..destination(id, name, city, &[])
        }
    }

    #[test]
    fn memory_catalog_get_by_id() {
        let catalog = MemoryCatalog::with_destinations(vec![destination(
            "poi-1",
            "Central Library",
            "Enugu",
            &["books"],
        )]);
        let found = catalog.get_by_id("poi-1").unwrap().unwrap();
        assert_eq!(found.name, "Central Library");
        assert_eq!(catalog.get_by_id("poi-9").unwrap(), None);
    }

    #[test]
    fn list_by_city_filters_tags() {
        let catalog = MemoryCatalog::with_destinations(vec![
            destination("poi-1", "Central Library", "Enugu", &["books", "quiet"]),
            destination("poi-2", "Market Square", "Enugu", &["food"]),
            destination("poi-3", "Harbor Walk", "Lagos", &["quiet"]),
        ]);

        let all_enugu = catalog.list_by_city("enugu", &[], None).unwrap();
        assert_eq!(all_enugu.len(), 2);

        let quiet = catalog
            .list_by_city("Enugu", &["quiet".to_string()], None)
            .unwrap();
        assert_eq!(quiet.len(), 1);
        assert_eq!(quiet[0].id, "poi-1");
    }

    #[test]
    fn list_by_city_filters_budget() {
        let catalog = MemoryCatalog::with_destinations(vec![
            budgeted("poi-1", "Central Library", "Enugu", "free"),
            budgeted("poi-2", "Market Square", "Enugu", "low"),
            destination("poi-3", "Hilltop Path", "Enugu", &[]),
        ]);

        let free = catalog.list_by_city("Enugu", &[], Some("free")).unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, "poi-1");

        // No budget filter matches every bracket, including untyped records.
        let all = catalog.list_by_city("Enugu", &[], None).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn unique_tags_sorted_and_deduplicated() {
        let catalog = MemoryCatalog::with_destinations(vec![
            destination("poi-1", "Central Library", "Enugu", &["quiet", "books"]),
            destination("poi-2", "Reading Garden", "Enugu", &["quiet", "garden"]),
            destination("poi-3", "Harbor Walk", "Lagos", &["harbor"]),
        ]);

        let tags = catalog.unique_tags("Enugu").unwrap();
        assert_eq!(tags, vec!["books", "garden", "quiet"]);
    }

    #[test]
    fn unique_budgets_ordered_cheapest_first() {
        let catalog = MemoryCatalog::with_destinations(vec![
            budgeted("poi-1", "Gallery", "Enugu", "high"),
            budgeted("poi-2", "Park", "Enugu", "free"),
            budgeted("poi-3", "Museum", "Enugu", "medium"),
            budgeted("poi-4", "Kiosk", "Enugu", "low"),
            budgeted("poi-5", "Harbor Walk", "Lagos", "free"),
        ]);

        let budgets = catalog.unique_budgets("Enugu").unwrap();
        assert_eq!(budgets, vec!["free", "low", "medium", "high"]);
    }

    #[test]
    fn durable_catalog_roundtrip() {
        let dir = TempDir::new().unwrap();
        let catalog = DurableCatalog::open(dir.path()).unwrap();

        assert_eq!(catalog.get_by_id("poi-1").unwrap(), None);

        let dest = destination("poi-1", "Central Library", "Enugu", &["books"]);
        catalog.upsert(&dest).unwrap();
        assert_eq!(catalog.get_by_id("poi-1").unwrap(), Some(dest));
    }

    #[test]
    fn durable_catalog_list_sorted_by_name() {
        let dir = TempDir::new().unwrap();
        let catalog = DurableCatalog::open(dir.path()).unwrap();

        catalog
            .upsert(&destination("poi-2", "Market Square", "Enugu", &[]))
            .unwrap();
        catalog
            .upsert(&destination("poi-1", "Central Library", "Enugu", &[]))
            .unwrap();

        let listed = catalog.list_by_city("Enugu", &[], None).unwrap();
        let names: Vec<&str> = listed.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Central Library", "Market Square"]);
    }

    #[test]
    fn durable_catalog_facet_queries() {
        let dir = TempDir::new().unwrap();
        let catalog = DurableCatalog::open(dir.path()).unwrap();

        catalog
            .upsert(&budgeted("poi-1", "Park", "Enugu", "free"))
            .unwrap();
        catalog
            .upsert(&budgeted("poi-2", "Gallery", "Enugu", "medium"))
            .unwrap();

        assert_eq!(catalog.unique_budgets("Enugu").unwrap(), vec!["free", "medium"]);
        assert!(catalog.unique_tags("Enugu").unwrap().is_empty());
    }
}
