//! Context index: nearest-neighbor search over pre-embedded text chunks.
//!
//! The index is built offline from a fixed corpus and loaded as a static
//! asset at process start. At runtime it is read-only. Callers cannot
//! distinguish "no index" from "no match": both yield an empty chunk list,
//! and `search` never fails.

use std::path::Path;

use anndists::dist::DistCosine;
use hnsw_rs::hnsw::Hnsw;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// One embedded chunk of the knowledge corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    /// The chunk text returned to callers.
    pub text: String,
    /// Its embedding, produced offline by the same model used for queries.
    pub embedding: Vec<f32>,
}

/// Serializable form of the index: the corpus with its embeddings.
///
/// The HNSW graph itself is cheap to rebuild at load time, so the snapshot
/// stores only entries and the shared dimension.
#[derive(Debug, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub dimension: usize,
    pub entries: Vec<ContextEntry>,
}

impl ContextSnapshot {
    /// Build a snapshot from entries, validating the shared dimension.
    pub fn new(entries: Vec<ContextEntry>) -> Result<Self, IndexError> {
        let dimension = match entries.first() {
            Some(e) => e.embedding.len(),
            None => return Err(IndexError::Empty),
        };
        for entry in &entries {
            if entry.embedding.len() != dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: entry.embedding.len(),
                });
            }
        }
        Ok(Self { dimension, entries })
    }

    /// Write the snapshot to disk (offline indexing tooling).
    pub fn write(&self, path: &Path) -> Result<(), IndexError> {
        let bytes = bincode::serialize(self).map_err(|e| IndexError::Snapshot {
            message: format!("serialize failed: {e}"),
        })?;
        std::fs::write(path, bytes).map_err(|e| IndexError::Snapshot {
            message: format!("write to {} failed: {e}", path.display()),
        })
    }

    /// Read a snapshot from disk.
    pub fn read(path: &Path) -> Result<Self, IndexError> {
        let bytes = std::fs::read(path).map_err(|e| IndexError::Snapshot {
            message: format!("read from {} failed: {e}", path.display()),
        })?;
        bincode::deserialize(&bytes).map_err(|e| IndexError::Snapshot {
            message: format!("deserialize failed: {e}"),
        })
    }
}

struct IndexState {
    hnsw: Hnsw<'static, f32, DistCosine>,
    chunks: Vec<String>,
    dimension: usize,
}

/// Read-only ANN index over the chunk corpus.
pub struct ContextIndex {
    state: Option<IndexState>,
}

// Safety: Hnsw uses internal synchronization via atomics/locks, and the
// index is never mutated after construction.
unsafe impl Send for ContextIndex {}
unsafe impl Sync for ContextIndex {}

impl ContextIndex {
    /// An index with no backing corpus. Every search returns the empty list.
    pub fn unavailable() -> Self {
        Self { state: None }
    }

    /// Build an index from embedded entries.
    pub fn from_entries(entries: Vec<ContextEntry>) -> Result<Self, IndexError> {
        let snapshot = ContextSnapshot::new(entries)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Build an index from a validated snapshot.
    pub fn from_snapshot(snapshot: ContextSnapshot) -> Self {
        let capacity = snapshot.entries.len().max(1);
        // HNSW parameters: 16 connections and ef_construction 200 are the
        // standard settings for corpora of this size; max_layer is derived
        // from the expected element count.
        let max_layer = (capacity as f64).log2().ceil() as usize;
        let max_layer = max_layer.clamp(4, 16);
        let hnsw = Hnsw::new(16, capacity, max_layer, 200, DistCosine {});

        let mut chunks = Vec::with_capacity(snapshot.entries.len());
        for (id, entry) in snapshot.entries.into_iter().enumerate() {
            hnsw.insert((&entry.embedding, id));
            chunks.push(entry.text);
        }

        tracing::info!(
            chunks = chunks.len(),
            dimension = snapshot.dimension,
            "context index loaded"
        );

        Self {
            state: Some(IndexState {
                hnsw,
                chunks,
                dimension: snapshot.dimension,
            }),
        }
    }

    /// Load an index from a snapshot file.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let snapshot = ContextSnapshot::read(path)?;
        if snapshot.entries.is_empty() {
            return Err(IndexError::Empty);
        }
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load an index, degrading to the unavailable state on any failure.
    ///
    /// This is the process-start path: a missing knowledge base must not
    /// prevent the engine from serving fallback narratives.
    pub fn load_or_unavailable(path: &Path) -> Self {
        match Self::load(path) {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "context index unavailable");
                Self::unavailable()
            }
        }
    }

    /// Whether a corpus is loaded.
    pub fn is_available(&self) -> bool {
        self.state.is_some()
    }

    /// Number of chunks in the corpus (0 when unavailable).
    pub fn len(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.chunks.len())
    }

    /// Whether the corpus is empty or unavailable.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the `k` chunks nearest to the query vector, best first.
    ///
    /// Returns fewer than `k` when the corpus is smaller than `k`, and the
    /// empty list when the index is unavailable or the query dimension does
    /// not match the corpus. Never an error.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<String> {
        let Some(state) = &self.state else {
            return Vec::new();
        };
        if k == 0 {
            return Vec::new();
        }
        if query.len() != state.dimension {
            tracing::warn!(
                expected = state.dimension,
                actual = query.len(),
                "query dimension does not match index; returning empty context"
            );
            return Vec::new();
        }

        let ef_search = (k * 2).max(32);
        let neighbours = state.hnsw.search(query, k, ef_search);

        let mut ranked: Vec<(f32, usize)> = neighbours
            .into_iter()
            .filter(|n| n.d_id < state.chunks.len())
            .map(|n| (n.distance, n.d_id))
            .collect();
        ranked.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        ranked
            .into_iter()
            .take(k)
            .map(|(_, id)| state.chunks[id].clone())
            .collect()
    }
}

impl std::fmt::Debug for ContextIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextIndex")
            .field("available", &self.is_available())
            .field("chunks", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, embedding: Vec<f32>) -> ContextEntry {
        ContextEntry {
            text: text.into(),
            embedding,
        }
    }

    #[test]
    fn search_finds_nearest_chunk() {
        let index = ContextIndex::from_entries(vec![
            entry("clock tower", vec![1.0, 0.0, 0.0]),
            entry("market square", vec![0.0, 1.0, 0.0]),
            entry("river bridge", vec![0.0, 0.0, 1.0]),
        ])
        .unwrap();

        let results = index.search(&[0.9, 0.1, 0.0], 1);
        assert_eq!(results, vec!["clock tower".to_string()]);
    }

    #[test]
    fn search_returns_fewer_than_k_on_small_corpus() {
        let index = ContextIndex::from_entries(vec![
            entry("clock tower", vec![1.0, 0.0]),
            entry("market square", vec![0.0, 1.0]),
        ])
        .unwrap();

        let results = index.search(&[1.0, 0.0], 5);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn unavailable_index_returns_empty() {
        let index = ContextIndex::unavailable();
        assert!(index.search(&[1.0, 0.0], 5).is_empty());
        assert!(!index.is_available());
    }

    #[test]
    fn dimension_mismatch_returns_empty() {
        let index = ContextIndex::from_entries(vec![entry("chunk", vec![1.0, 0.0, 0.0])]).unwrap();
        assert!(index.search(&[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn mixed_dimensions_rejected_at_build() {
        let result = ContextIndex::from_entries(vec![
            entry("a", vec![1.0, 0.0]),
            entry("b", vec![1.0, 0.0, 0.0]),
        ]);
        assert!(matches!(
            result,
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn empty_corpus_rejected_at_build() {
        assert!(matches!(
            ContextIndex::from_entries(vec![]),
            Err(IndexError::Empty)
        ));
    }

    #[test]
    fn snapshot_roundtrip_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("context.idx");

        let snapshot = ContextSnapshot::new(vec![
            entry("clock tower", vec![1.0, 0.0]),
            entry("market square", vec![0.0, 1.0]),
        ])
        .unwrap();
        snapshot.write(&path).unwrap();

        let index = ContextIndex::load(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.search(&[0.0, 1.0], 1), vec!["market square".to_string()]);
    }

    #[test]
    fn load_or_unavailable_degrades_on_missing_file() {
        let index = ContextIndex::load_or_unavailable(Path::new("/nonexistent/context.idx"));
        assert!(!index.is_available());
        assert!(index.search(&[1.0], 5).is_empty());
    }
}
