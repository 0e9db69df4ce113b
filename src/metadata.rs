// Per-file symbol metadata used by the keyword pass
// Rebuilt from scratch on every scan; there is no incremental update path.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::parser::Symbols;
use crate::persist;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Path relative to the project root, `/` separated
    pub file: String,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
}

impl FileMetadata {
    pub fn new(file: impl Into<String>, symbols: Symbols) -> Self {
        Self {
            file: file.into(),
            functions: symbols.functions,
            classes: symbols.classes,
        }
    }
}

/// Ordered list of metadata records, one per indexed file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataIndex {
    records: Vec<FileMetadata>,
}

impl MetadataIndex {
    pub fn new(records: Vec<FileMetadata>) -> Self {
        Self { records }
    }

    /// Load the metadata table; missing or unreadable files give an empty index
    pub fn load(config: &StoreConfig) -> Self {
        Self::load_from(&config.metadata_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match persist::read_json::<Vec<FileMetadata>>(path) {
            Some(records) => {
                debug!("Loaded {} metadata records", records.len());
                Self { records }
            }
            None => {
                warn!(
                    "No metadata found at {}, keyword search will find nothing",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, config: &StoreConfig) -> Result<()> {
        persist::write_json(&config.metadata_path(), &self.records)
    }

    pub fn records(&self) -> &[FileMetadata] {
        &self.records
    }

    pub fn push(&mut self, record: FileMetadata) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path());

        let mut index = MetadataIndex::default();
        index.push(FileMetadata::new(
            "utils/math_ops.py",
            Symbols {
                functions: vec!["add_vectors".to_string()],
                classes: vec![],
            },
        ));
        index.push(FileMetadata::new("main.py", Symbols::default()));
        index.save(&config).unwrap();

        let loaded = MetadataIndex::load(&config);
        assert_eq!(loaded, index);
        assert_eq!(loaded.records()[0].file, "utils/math_ops.py");

        let raw = fs::read_to_string(config.metadata_path()).unwrap();
        assert!(raw.contains("\"functions\": ["));
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path());
        fs::write(config.metadata_path(), r#"[{"file": "a.py"}]"#).unwrap();

        let loaded = MetadataIndex::load(&config);
        assert_eq!(loaded.len(), 1);
        assert!(loaded.records()[0].functions.is_empty());
    }

    #[test]
    fn test_missing_or_corrupted_file() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path());
        assert!(MetadataIndex::load(&config).is_empty());

        fs::write(config.metadata_path(), "{\"file\": ").unwrap();
        assert!(MetadataIndex::load(&config).is_empty());
    }
}
