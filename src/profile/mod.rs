//! User preference profiles and the stores that persist them.
//!
//! A profile is two lists of topic strings, case-normalized and deduplicated.
//! An absent profile is equivalent to an empty one, and a store that cannot
//! be read degrades to the empty profile — personalization is never allowed
//! to take narrative generation down with it.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use redb::{Database, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Table of user documents: user id → JSON document bytes.
const USERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// A user's topical likes and dislikes.
///
/// Construct with [`PreferenceProfile::new`] to get normalization; the raw
/// struct is only deserialized at trusted boundaries and re-normalized there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceProfile {
    pub likes: Vec<String>,
    pub dislikes: Vec<String>,
}

impl PreferenceProfile {
    /// Build a profile, trimming, lowercasing, and deduplicating each list.
    pub fn new<I, S>(likes: I, dislikes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            likes: normalize(likes),
            dislikes: normalize(dislikes),
        }
    }

    /// Re-apply normalization to a deserialized profile.
    pub fn normalized(&self) -> Self {
        Self::new(self.likes.iter(), self.dislikes.iter())
    }

    /// Whether both lists are empty.
    pub fn is_empty(&self) -> bool {
        self.likes.is_empty() && self.dislikes.is_empty()
    }

    /// One-line rendering for prompt assembly.
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "No known preferences yet.".into();
        }
        format!(
            "Likes: [{}]. Dislikes: [{}].",
            self.likes.join(", "),
            self.dislikes.join(", ")
        )
    }
}

/// Trim, lowercase, drop empties, and deduplicate preserving first-seen order.
fn normalize<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let cleaned = item.as_ref().trim().to_lowercase();
        if !cleaned.is_empty() && seen.insert(cleaned.clone()) {
            out.push(cleaned);
        }
    }
    out
}

/// Persisted per-user document. The profile lives under a `preferences`
/// sub-object so the document can grow other sections without migration.
#[derive(Debug, Serialize, Deserialize)]
struct UserDocument {
    preferences: PreferenceProfile,
}

/// Key-value store of preference profiles, keyed by user id.
///
/// Upsert semantics: a user is created implicitly on first write. The core
/// never deletes a profile. Concurrent upserts for the same user are
/// last-write-wins.
pub trait PreferenceStore: Send + Sync {
    /// Read a profile. `Ok(None)` means the user has never been written.
    fn get(&self, user_id: &str) -> Result<Option<PreferenceProfile>, StoreError>;

    /// Insert or replace the profile for a user, wholesale.
    fn upsert(&self, user_id: &str, profile: &PreferenceProfile) -> Result<(), StoreError>;
}

/// Read a profile, degrading to the empty profile on absence or failure.
///
/// This is the only read path the pipeline uses: a preference-store outage
/// must degrade personalization, not abort narrative generation.
pub fn load_or_default(store: &dyn PreferenceStore, user_id: &str) -> PreferenceProfile {
    match store.get(user_id) {
        Ok(Some(profile)) => profile.normalized(),
        Ok(None) => PreferenceProfile::default(),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "preference read failed; using empty profile");
            PreferenceProfile::default()
        }
    }
}

/// Durable preference store backed by redb.
///
/// All writes go through transactions; reads use MVCC snapshots.
pub struct DurablePreferenceStore {
    db: Arc<Database>,
}

impl DurablePreferenceStore {
    /// Open against a shared database handle.
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Open or create a standalone store in the given directory.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(open_database(data_dir)?))
    }
}

/// Open or create the shared wayscribe database in a directory.
///
/// The preference store and the destination catalog share one redb file;
/// both tables live in it.
pub fn open_database(data_dir: &Path) -> Result<Arc<Database>, StoreError> {
    std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
    let db_path = data_dir.join("wayscribe.redb");
    let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
        message: format!("failed to open redb at {}: {e}", db_path.display()),
    })?;
    Ok(Arc::new(db))
}

impl PreferenceStore for DurablePreferenceStore {
    fn get(&self, user_id: &str) -> Result<Option<PreferenceProfile>, StoreError> {
        let txn = self.db.begin_read().map_err(|e| StoreError::Redb {
            message: format!("begin_read failed: {e}"),
        })?;
        let table = match txn.open_table(USERS_TABLE) {
            Ok(table) => table,
            // First read before any write: the table does not exist yet.
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => {
                return Err(StoreError::Redb {
                    message: format!("open_table failed: {e}"),
                });
            }
        };
        let Some(guard) = table.get(user_id).map_err(|e| StoreError::Redb {
            message: format!("get failed: {e}"),
        })?
        else {
            return Ok(None);
        };
        let doc: UserDocument =
            serde_json::from_slice(guard.value()).map_err(|e| StoreError::Serialization {
                message: format!("user document for {user_id}: {e}"),
            })?;
        Ok(Some(doc.preferences))
    }

    fn upsert(&self, user_id: &str, profile: &PreferenceProfile) -> Result<(), StoreError> {
        let doc = UserDocument {
            preferences: profile.clone(),
        };
        let bytes = serde_json::to_vec(&doc).map_err(|e| StoreError::Serialization {
            message: format!("user document for {user_id}: {e}"),
        })?;

        let txn = self.db.begin_write().map_err(|e| StoreError::Redb {
            message: format!("begin_write failed: {e}"),
        })?;
        {
            let mut table = txn.open_table(USERS_TABLE).map_err(|e| StoreError::Redb {
                message: format!("open_table failed: {e}"),
            })?;
            table
                .insert(user_id, bytes.as_slice())
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

impl std::fmt::Debug for DurablePreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurablePreferenceStore").finish()
    }
}

/// In-memory preference store for tests and memory-only deployments.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    profiles: DashMap<String, PreferenceProfile>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, user_id: &str) -> Result<Option<PreferenceProfile>, StoreError> {
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    fn upsert(&self, user_id: &str, profile: &PreferenceProfile) -> Result<(), StoreError> {
        self.profiles.insert(user_id.to_string(), profile.clone());
        Ok(())
    }
}
