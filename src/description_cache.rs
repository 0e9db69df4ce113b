// Description cache for per-file summaries
// Summaries are expensive (one LLM call each), so a cached summary is reused
// and only recomputed when its access count hits the throttle interval.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::error::Result;
use crate::persist;

/// Default throttle interval: refresh on every 5th touch
pub const DEFAULT_THROTTLE_INTERVAL: u32 = 5;

/// Cached summary of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(alias = "desc")]
    pub description: String,
    /// Times the summary was refreshed. Older files may lack it.
    #[serde(alias = "count", default, skip_serializing_if = "Option::is_none")]
    pub access_count: Option<u32>,
}

impl CacheEntry {
    /// Count used by the throttle check; a missing count counts as 1
    pub fn effective_count(&self) -> u32 {
        self.access_count.unwrap_or(1)
    }
}

/// File path -> (summary, access count), persisted as one JSON table
#[derive(Debug)]
pub struct DescriptionCache {
    path: PathBuf,
    throttle_interval: u32,
    entries: BTreeMap<String, CacheEntry>,
}

impl DescriptionCache {
    /// Load the cache described by `config`. A missing or corrupted file
    /// gives an empty cache.
    pub fn load(config: &StoreConfig) -> Self {
        Self::load_from(config.descriptions_path(), DEFAULT_THROTTLE_INTERVAL)
    }

    pub fn load_from(path: impl Into<PathBuf>, throttle_interval: u32) -> Self {
        let path = path.into();
        let entries: BTreeMap<String, CacheEntry> = persist::read_json(&path).unwrap_or_default();
        debug!(
            "Loaded description cache with {} entries from {}",
            entries.len(),
            path.display()
        );

        Self {
            path,
            throttle_interval: throttle_interval.max(1),
            entries,
        }
    }

    pub fn with_throttle_interval(mut self, interval: u32) -> Self {
        self.throttle_interval = interval.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn throttle_interval(&self) -> u32 {
        self.throttle_interval
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached summary, if any
    pub fn get(&self, file_path: &str) -> Option<&str> {
        self.entries
            .get(file_path)
            .map(|entry| entry.description.as_str())
    }

    pub fn entry(&self, file_path: &str) -> Option<&CacheEntry> {
        self.entries.get(file_path)
    }

    /// Whether a fresh summary should be requested for `file_path`
    pub fn should_refresh(&self, file_path: &str) -> bool {
        match self.entries.get(file_path) {
            None => true,
            Some(entry) => entry.effective_count() % self.throttle_interval == 0,
        }
    }

    /// Store `description` and bump the access count, then flush to disk.
    /// If the flush fails the entry is left as it was.
    pub fn touch(&mut self, file_path: &str, description: &str) -> Result<()> {
        let previous = self.entries.get(file_path).cloned();
        let entry = CacheEntry {
            description: description.to_string(),
            access_count: Some(previous.as_ref().and_then(|e| e.access_count).unwrap_or(0) + 1),
        };
        debug!(
            "Touched {} (access count {})",
            file_path,
            entry.effective_count()
        );
        self.entries.insert(file_path.to_string(), entry);

        if let Err(e) = self.persist() {
            match previous {
                Some(entry) => self.entries.insert(file_path.to_string(), entry),
                None => self.entries.remove(file_path),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Forget every summary and delete the cache file
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        persist::remove_if_exists(&self.path)?;
        info!("Cleared description cache");
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        persist::write_json(&self.path, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_cache() -> (DescriptionCache, TempDir) {
        let dir = TempDir::new().unwrap();
        let cache = DescriptionCache::load(&StoreConfig::new(dir.path()));
        (cache, dir)
    }

    #[test]
    fn test_throttle_law() {
        let (mut cache, _dir) = create_test_cache();

        let mut decisions = Vec::new();
        for i in 0..5 {
            decisions.push(cache.should_refresh("a.py"));
            cache.touch("a.py", &format!("summary {}", i)).unwrap();
        }
        decisions.push(cache.should_refresh("a.py"));

        assert_eq!(decisions, vec![true, false, false, false, false, true]);
        assert_eq!(cache.entry("a.py").unwrap().access_count, Some(5));
    }

    #[test]
    fn test_refresh_every_nth_touch() {
        let (mut cache, _dir) = create_test_cache();
        for n in 1..=12u32 {
            cache.touch("b.py", "summary").unwrap();
            assert_eq!(cache.should_refresh("b.py"), n % 5 == 0, "after {} touches", n);
        }
    }

    #[test]
    fn test_custom_interval() {
        let (cache, _dir) = create_test_cache();
        let mut cache = cache.with_throttle_interval(2);
        cache.touch("a.py", "x").unwrap();
        assert!(!cache.should_refresh("a.py"));
        cache.touch("a.py", "y").unwrap();
        assert!(cache.should_refresh("a.py"));
    }

    #[test]
    fn test_get_has_no_side_effects() {
        let (mut cache, _dir) = create_test_cache();
        assert_eq!(cache.get("a.py"), None);

        cache.touch("a.py", "Parses configuration files.").unwrap();
        assert_eq!(cache.get("a.py"), Some("Parses configuration files."));
        assert_eq!(cache.get("a.py"), Some("Parses configuration files."));
        assert_eq!(cache.entry("a.py").unwrap().access_count, Some(1));
    }

    #[test]
    fn test_touch_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path());

        let mut cache = DescriptionCache::load(&config);
        cache.touch("src/main.py", "Entry point.").unwrap();
        cache.touch("src/main.py", "Entry point of the CLI.").unwrap();

        let reloaded = DescriptionCache::load(&config);
        assert_eq!(reloaded.get("src/main.py"), Some("Entry point of the CLI."));
        assert_eq!(reloaded.entry("src/main.py").unwrap().access_count, Some(2));
    }

    #[test]
    fn test_missing_count_counts_as_one() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path());
        fs::write(
            config.descriptions_path(),
            r#"{"legacy.py": {"desc": "Old entry"}, "five.py": {"desc": "Due", "count": 5}}"#,
        )
        .unwrap();

        let mut cache = DescriptionCache::load(&config);
        assert_eq!(cache.get("legacy.py"), Some("Old entry"));
        assert!(!cache.should_refresh("legacy.py"));
        assert!(cache.should_refresh("five.py"));

        cache.touch("legacy.py", "New entry").unwrap();
        assert_eq!(cache.entry("legacy.py").unwrap().access_count, Some(1));
    }

    #[test]
    fn test_corrupted_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let config = StoreConfig::new(dir.path());
        fs::write(config.descriptions_path(), "[1, 2").unwrap();

        let cache = DescriptionCache::load(&config);
        assert!(cache.is_empty());
        assert!(cache.should_refresh("anything.py"));
    }

    #[test]
    fn test_write_failure_propagates() {
        let dir = TempDir::new().unwrap();
        // A directory where the cache file should be makes the rename fail
        let blocked = dir.path().join("descriptions.json");
        fs::create_dir_all(blocked.join("occupied")).unwrap();

        let mut cache = DescriptionCache::load_from(&blocked, 5);
        assert!(cache.touch("a.py", "summary").is_err());
        assert_eq!(cache.get("a.py"), None);
        assert!(cache.should_refresh("a.py"));
    }

    #[test]
    fn test_failed_touch_keeps_previous_entry() {
        let (mut cache, _dir) = create_test_cache();
        cache.touch("a.py", "first").unwrap();

        let path = cache.path().to_path_buf();
        fs::remove_file(&path).unwrap();
        fs::create_dir_all(path.join("occupied")).unwrap();
        assert!(cache.touch("a.py", "second").is_err());
        assert_eq!(cache.get("a.py"), Some("first"));
        assert_eq!(cache.entry("a.py").unwrap().access_count, Some(1));

        fs::remove_dir_all(&path).unwrap();
        cache.touch("a.py", "third").unwrap();
        assert_eq!(cache.entry("a.py").unwrap().access_count, Some(2));

        let reloaded = DescriptionCache::load_from(&path, 5);
        assert_eq!(reloaded.get("a.py"), Some("third"));
        assert_eq!(reloaded.entry("a.py").unwrap().access_count, Some(2));
    }

    #[test]
    fn test_clear() {
        let (mut cache, _dir) = create_test_cache();
        cache.touch("a.py", "summary").unwrap();
        assert!(cache.path().exists());

        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert!(!cache.path().exists());
        assert!(cache.should_refresh("a.py"));
    }
}
