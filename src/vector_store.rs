//! Persistent nearest-neighbor index over per-file summary embeddings.
//!
//! Two artifacts make up the store:
//! - the index (`vector.index`): a flat binary file of unit vectors in slot order
//! - the id map (`embeddings_map.json`): slot number → file path
//!
//! # Index format
//!
//! - Header (16 bytes): magic `PAVX`, format version, dimension, vector count (u32 LE)
//! - Vectors: contiguous f32 values in little-endian order
//!
//! Search is exhaustive. Distances are squared Euclidean on unit vectors,
//! which orders results exactly like cosine similarity.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{AssistError, Result};
use crate::persist;

const MAGIC_BYTES: &[u8; 4] = b"PAVX";
const FORMAT_VERSION: u32 = 1;
const HEADER_SIZE: usize = 16;
const BYTES_PER_F32: usize = 4;

/// Scale `vector` to unit length. Zero vectors are returned unchanged.
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter().map(|x| x / norm).collect()
    } else {
        vector.to_vec()
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Exact (brute force) L2 index. Slot `i` is the i-th inserted vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector, returning its slot
    fn push(&mut self, vector: &[f32]) -> usize {
        debug_assert_eq!(vector.len(), self.dimension);
        self.data.extend_from_slice(vector);
        self.len() - 1
    }

    fn pop(&mut self) {
        let len = self.data.len().saturating_sub(self.dimension);
        self.data.truncate(len);
    }

    /// The `k` nearest slots to `query`, nearest first, ties broken by slot
    fn nearest(&self, query: &[f32], k: usize) -> Vec<(f32, usize)> {
        let mut scored: Vec<(f32, usize)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(slot, stored)| (squared_l2(query, stored), slot))
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);
        scored
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.data.len() * BYTES_PER_F32);
        bytes.extend_from_slice(MAGIC_BYTES);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() < HEADER_SIZE {
            return Err(format!("file too short ({} bytes)", bytes.len()));
        }
        if &bytes[0..4] != MAGIC_BYTES {
            return Err("bad magic bytes".to_string());
        }

        let read_u32 = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ]) as usize
        };

        let version = read_u32(4) as u32;
        if version != FORMAT_VERSION {
            return Err(format!(
                "unsupported format version {} (expected {})",
                version, FORMAT_VERSION
            ));
        }

        let dimension = read_u32(8);
        let count = read_u32(12);
        if dimension == 0 {
            return Err("dimension is zero".to_string());
        }

        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(BYTES_PER_F32))
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| "header overflows".to_string())?;
        if bytes.len() != expected {
            return Err(format!(
                "expected {} bytes for {} vectors of dimension {}, found {}",
                expected,
                count,
                dimension,
                bytes.len()
            ));
        }

        let data = bytes[HEADER_SIZE..]
            .chunks_exact(BYTES_PER_F32)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        Ok(Self { dimension, data })
    }
}

/// A search hit: squared distance to the query and the file it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub distance: f32,
    pub file_path: String,
}

/// Similarity index over file-summary embeddings, durable across runs
#[derive(Debug)]
pub struct VectorStore {
    index_path: PathBuf,
    id_map_path: PathBuf,
    index: Option<FlatIndex>,
    id_map: BTreeMap<usize, String>,
}

impl VectorStore {
    /// Open the store described by `config`. Missing or damaged artifacts give
    /// an empty, uninitialized store; this never fails.
    pub fn load(config: &StoreConfig) -> Self {
        let mut store = Self {
            index_path: config.index_path(),
            id_map_path: config.id_map_path(),
            index: None,
            id_map: BTreeMap::new(),
        };

        let Some(id_map) = persist::read_json::<BTreeMap<usize, String>>(&store.id_map_path) else {
            debug!(
                "No usable id map at {}, starting with an empty vector store",
                store.id_map_path.display()
            );
            return store;
        };

        let index = match fs::read(&store.index_path) {
            Ok(bytes) => match FlatIndex::from_bytes(&bytes) {
                Ok(index) => index,
                Err(e) => {
                    warn!(
                        "Vector index {} is corrupted ({}), starting empty",
                        store.index_path.display(),
                        e
                    );
                    return store;
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !id_map.is_empty() {
                    warn!(
                        "Id map lists {} entries but {} is missing, starting empty",
                        id_map.len(),
                        store.index_path.display()
                    );
                }
                return store;
            }
            Err(e) => {
                warn!(
                    "Failed to read vector index {}: {}",
                    store.index_path.display(),
                    e
                );
                return store;
            }
        };

        let size = index.len();
        let before = id_map.len();
        store.id_map = id_map.into_iter().filter(|(slot, _)| *slot < size).collect();
        if store.id_map.len() != before {
            warn!(
                "Dropped {} id map entries pointing past the end of the index ({} vectors)",
                before - store.id_map.len(),
                size
            );
        }
        store.index = Some(index);

        info!(
            "Loaded vector store: {} vectors, {} mapped paths",
            size,
            store.id_map.len()
        );
        store
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.index.as_ref().map_or(0, FlatIndex::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimension fixed by the first insert, `None` until then
    pub fn dimension(&self) -> Option<usize> {
        self.index.as_ref().map(FlatIndex::dimension)
    }

    pub fn path_for_slot(&self, slot: usize) -> Option<&str> {
        self.id_map.get(&slot).map(String::as_str)
    }

    /// Insert `vector` for `file_path` and return its slot.
    ///
    /// With `persist_now == false` the caller must call [`VectorStore::persist`]
    /// afterwards; full scans use this to flush once at the end.
    pub fn add(&mut self, vector: &[f32], file_path: &str, persist_now: bool) -> Result<usize> {
        if vector.is_empty() {
            return Err(AssistError::InvalidArgument(
                "cannot index an empty vector".to_string(),
            ));
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(AssistError::InvalidArgument(format!(
                "embedding for {} contains non-finite values",
                file_path
            )));
        }

        let was_uninitialized = self.index.is_none();
        let index = self.index.get_or_insert_with(|| {
            debug!("Initializing vector index with dimension {}", vector.len());
            FlatIndex::new(vector.len())
        });
        if index.dimension() != vector.len() {
            return Err(AssistError::DimensionMismatch {
                expected: index.dimension(),
                actual: vector.len(),
            });
        }

        let slot = index.push(&normalize(vector));
        self.id_map.insert(slot, file_path.to_string());
        debug!("Indexed {} at slot {}", file_path, slot);

        if persist_now {
            if let Err(e) = self.persist() {
                // Keep memory in step with what was last written
                self.id_map.remove(&slot);
                if was_uninitialized {
                    self.index = None;
                } else if let Some(index) = self.index.as_mut() {
                    index.pop();
                }
                warn!("Could not persist {}, insert rolled back", file_path);
                return Err(e);
            }
        }
        Ok(slot)
    }

    /// Up to `k` nearest files to `vector`, nearest first.
    ///
    /// An uninitialized or empty store yields no hits. `k` larger than the
    /// store is clamped.
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<VectorHit>> {
        if k == 0 {
            return Err(AssistError::InvalidArgument(
                "k must be at least 1".to_string(),
            ));
        }

        let index = match &self.index {
            Some(index) if !index.is_empty() => index,
            _ => return Ok(Vec::new()),
        };
        if vector.len() != index.dimension() {
            return Err(AssistError::DimensionMismatch {
                expected: index.dimension(),
                actual: vector.len(),
            });
        }

        let k = k.min(index.len());
        let query = normalize(vector);

        let mut skipped = 0;
        let hits: Vec<VectorHit> = index
            .nearest(&query, k)
            .into_iter()
            .filter_map(|(distance, slot)| match self.id_map.get(&slot) {
                Some(path) => Some(VectorHit {
                    distance,
                    file_path: path.clone(),
                }),
                None => {
                    skipped += 1;
                    None
                }
            })
            .collect();

        if skipped > 0 {
            warn!("Skipped {} index slots with no mapped path", skipped);
        }
        Ok(hits)
    }

    /// Write index and id map to disk. An uninitialized store writes only an
    /// empty id map.
    pub fn persist(&self) -> Result<()> {
        if let Some(index) = &self.index {
            persist::write_atomic(&self.index_path, &index.to_bytes())?;
        }
        persist::write_json(&self.id_map_path, &self.id_map)?;
        debug!(
            "Persisted vector store ({} vectors) to {}",
            self.len(),
            self.index_path.display()
        );
        Ok(())
    }

    /// Drop every vector and delete both artifacts
    pub fn clear(&mut self) -> Result<()> {
        self.index = None;
        self.id_map.clear();
        persist::remove_if_exists(&self.index_path)?;
        persist::remove_if_exists(&self.id_map_path)?;
        info!("Cleared vector store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_store() -> (VectorStore, StoreConfig, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path());
        (VectorStore::load(&config), config, dir)
    }

    #[test]
    fn test_normalize() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }

    #[test]
    fn test_empty_store_search() {
        let (store, _config, _dir) = create_test_store();
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
        assert!(store.search(&[1.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_search_finds_inserted_vector_first() {
        let (mut store, _config, _dir) = create_test_store();
        store.add(&[1.0, 0.0, 0.0], "a.py", false).unwrap();
        store.add(&[0.0, 2.0, 0.0], "b.py", false).unwrap();
        store.add(&[0.0, 0.0, 5.0], "c.py", false).unwrap();

        // Same direction, different magnitude
        let hits = store.search(&[0.0, 7.0, 0.0], 3).unwrap();
        assert_eq!(hits[0].file_path, "b.py");
        assert!(hits[0].distance.abs() < 1e-6);
        assert!(hits[1].distance >= hits[0].distance);
        assert!(hits[2].distance >= hits[1].distance);
    }

    #[test]
    fn test_lazy_dimension_and_mismatch() {
        let (mut store, _config, _dir) = create_test_store();
        store.add(&[1.0, 2.0, 3.0], "a.py", false).unwrap();
        assert_eq!(store.dimension(), Some(3));

        let err = store.add(&[1.0, 2.0], "b.py", false).unwrap_err();
        assert!(matches!(
            err,
            AssistError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(store.len(), 1);

        assert!(store.search(&[1.0, 2.0], 1).is_err());
    }

    #[test]
    fn test_rejects_bad_input() {
        let (mut store, _config, _dir) = create_test_store();
        assert!(store.add(&[], "a.py", false).is_err());
        assert!(store.add(&[f32::NAN, 1.0], "a.py", false).is_err());
        assert_eq!(store.dimension(), None);

        store.add(&[1.0, 0.0], "a.py", false).unwrap();
        assert!(matches!(
            store.search(&[1.0, 0.0], 0),
            Err(AssistError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_slots_follow_insertion_order() {
        let (mut store, _config, _dir) = create_test_store();
        for i in 0..20 {
            let slot = store
                .add(&[i as f32 + 1.0, 1.0], &format!("file{}.py", i), false)
                .unwrap();
            assert_eq!(slot, i);
            assert_eq!(store.path_for_slot(slot), Some(format!("file{}.py", i).as_str()));
        }

        let hits = store.search(&[1.0, 1.0], 100).unwrap();
        assert_eq!(hits.len(), 20);
        for hit in &hits {
            assert!(hit.file_path.starts_with("file"));
        }
    }

    #[test]
    fn test_k_is_clamped() {
        let (mut store, _config, _dir) = create_test_store();
        store.add(&[1.0, 0.0], "a.py", false).unwrap();
        store.add(&[0.0, 1.0], "b.py", false).unwrap();
        assert_eq!(store.search(&[1.0, 0.0], 50).unwrap().len(), 2);
        assert_eq!(store.search(&[1.0, 0.0], 1).unwrap().len(), 1);
    }

    #[test]
    fn test_persist_and_reload() {
        let (mut store, config, _dir) = create_test_store();
        store.add(&[0.9, 0.1, 0.0], "src/a.py", false).unwrap();
        store.add(&[0.1, 0.9, 0.0], "src/b.py", false).unwrap();
        store.add(&[0.0, 0.3, 0.7], "src/c.py", false).unwrap();
        store.persist().unwrap();

        let query = [0.2, 0.8, 0.1];
        let before = store.search(&query, 3).unwrap();

        let reloaded = VectorStore::load(&config);
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.dimension(), Some(3));
        assert_eq!(reloaded.search(&query, 3).unwrap(), before);

        let map = fs::read_to_string(config.id_map_path()).unwrap();
        assert!(map.contains("\"0\": \"src/a.py\""));
    }

    #[test]
    fn test_batched_adds_are_not_flushed() {
        let (mut store, config, _dir) = create_test_store();
        store.add(&[1.0, 0.0], "a.py", false).unwrap();
        assert!(!config.index_path().exists());

        store.add(&[0.0, 1.0], "b.py", true).unwrap();
        assert!(config.index_path().exists());
        assert_eq!(VectorStore::load(&config).len(), 2);
    }

    #[test]
    fn test_failed_flush_rolls_back_first_add() {
        let (mut store, config, _dir) = create_test_store();
        // A non-empty directory at the index path makes the rename fail
        fs::create_dir_all(config.index_path().join("occupied")).unwrap();

        assert!(store.add(&[1.0, 0.0], "a.py", true).is_err());
        assert!(store.is_empty());
        assert_eq!(store.dimension(), None);
        assert!(store.search(&[1.0, 0.0], 1).unwrap().is_empty());

        // The dimension is still open after the rollback
        fs::remove_dir_all(config.index_path()).unwrap();
        assert_eq!(store.add(&[0.0, 1.0, 0.0], "b.py", true).unwrap(), 0);
        let reloaded = VectorStore::load(&config);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.dimension(), Some(3));
    }

    #[test]
    fn test_failed_flush_keeps_earlier_vectors() {
        let (mut store, config, _dir) = create_test_store();
        store.add(&[1.0, 0.0], "a.py", false).unwrap();
        fs::create_dir_all(config.index_path().join("occupied")).unwrap();

        assert!(store.add(&[0.0, 1.0], "b.py", true).is_err());
        assert_eq!(store.len(), 1);
        assert_eq!(store.dimension(), Some(2));
        let hits = store.search(&[0.0, 1.0], 5).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "a.py");

        fs::remove_dir_all(config.index_path()).unwrap();
        assert_eq!(store.add(&[0.0, 1.0], "b.py", true).unwrap(), 1);
        assert_eq!(VectorStore::load(&config).len(), 2);
    }

    #[test]
    fn test_persist_empty_store() {
        let (store, config, _dir) = create_test_store();
        store.persist().unwrap();
        store.persist().unwrap();

        assert!(!config.index_path().exists());
        let map: BTreeMap<usize, String> =
            serde_json::from_str(&fs::read_to_string(config.id_map_path()).unwrap()).unwrap();
        assert!(map.is_empty());
        assert!(VectorStore::load(&config).is_empty());
    }

    #[test]
    fn test_corrupted_index_loads_empty() {
        let (mut store, config, _dir) = create_test_store();
        store.add(&[1.0, 0.0], "a.py", true).unwrap();

        fs::write(config.index_path(), b"garbage").unwrap();
        let reloaded = VectorStore::load(&config);
        assert!(reloaded.is_empty());
        assert!(reloaded.search(&[1.0, 0.0], 3).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_index_loads_empty() {
        let (mut store, config, _dir) = create_test_store();
        store.add(&[1.0, 0.0, 0.0], "a.py", false).unwrap();
        store.add(&[0.0, 1.0, 0.0], "b.py", true).unwrap();

        let bytes = fs::read(config.index_path()).unwrap();
        fs::write(config.index_path(), &bytes[..bytes.len() - 2]).unwrap();
        assert!(VectorStore::load(&config).is_empty());
    }

    #[test]
    fn test_missing_map_loads_empty() {
        let (mut store, config, _dir) = create_test_store();
        store.add(&[1.0, 0.0], "a.py", true).unwrap();
        fs::remove_file(config.id_map_path()).unwrap();

        assert!(VectorStore::load(&config).is_empty());
    }

    #[test]
    fn test_unmapped_slots_are_skipped() {
        let (mut store, config, _dir) = create_test_store();
        store.add(&[1.0, 0.0], "a.py", false).unwrap();
        store.add(&[0.9, 0.1], "b.py", false).unwrap();
        store.persist().unwrap();

        // Simulate a partially written map: slot 1 has no path
        fs::write(config.id_map_path(), "{\"0\": \"a.py\", \"7\": \"ghost.py\"}").unwrap();

        let reloaded = VectorStore::load(&config);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.path_for_slot(7), None);

        let hits = reloaded.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "a.py");
    }

    #[test]
    fn test_clear() {
        let (mut store, config, _dir) = create_test_store();
        store.add(&[1.0, 0.0], "a.py", true).unwrap();
        assert!(config.index_path().exists());
        assert!(config.id_map_path().exists());

        store.clear().unwrap();
        assert!(store.is_empty());
        assert!(store.search(&[1.0, 0.0], 1).unwrap().is_empty());
        assert!(!config.index_path().exists());
        assert!(!config.id_map_path().exists());

        // Clearing twice is fine, and the dimension can change afterwards
        store.clear().unwrap();
        store.add(&[1.0, 0.0, 0.0], "b.py", false).unwrap();
        assert_eq!(store.dimension(), Some(3));
    }
}
