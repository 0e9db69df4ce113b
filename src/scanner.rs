// Project scanner: summaries, symbols and embeddings for every source file
// Rebuilds the vector store, metadata index and structure overview in one pass.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AppConfig, ScanConfig, StoreConfig};
use crate::description_cache::DescriptionCache;
use crate::llm::{fallback_description, Embedder, Summarizer};
use crate::metadata::{FileMetadata, MetadataIndex};
use crate::parser::{SymbolParser, Symbols};
use crate::persist;
use crate::structure::{render_tree, TreeEntry};
use crate::vector_store::VectorStore;

/// Per-project ignore file, same syntax as .gitignore
pub const IGNORE_FILE: &str = ".assistantignore";

/// Counters reported after a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Source files visited
    pub files: usize,
    /// Files that got a vector in the store
    pub embedded: usize,
    /// Fresh summaries requested from the summarizer
    pub summarized: usize,
    /// Cached summaries reused under the throttle policy
    pub reused: usize,
    /// Summaries replaced by the first-line fallback
    pub fallbacks: usize,
    pub embedding_failures: usize,
    pub read_failures: usize,
}

pub struct ProjectScanner<S, E> {
    root: PathBuf,
    store_config: StoreConfig,
    scan_config: ScanConfig,
    summarizer: S,
    embedder: E,
    parser: SymbolParser,
}

impl<S: Summarizer, E: Embedder> ProjectScanner<S, E> {
    pub fn new(root: &Path, config: &AppConfig, summarizer: S, embedder: E) -> Self {
        Self {
            root: root.to_path_buf(),
            store_config: config.store.clone(),
            scan_config: config.scan.clone(),
            summarizer,
            embedder,
            parser: SymbolParser::new(),
        }
    }

    /// Source files to index, relative to the project root and sorted.
    /// Honors .gitignore and .assistantignore; hidden entries and the store
    /// directory are skipped.
    pub fn collect_files(&self) -> Vec<PathBuf> {
        let store_dir = self.store_config.dir.clone();
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_exclude(true)
            .require_git(false)
            .follow_links(false)
            .filter_entry(move |entry| entry.path() != store_dir.as_path());
        builder.add_custom_ignore_filename(IGNORE_FILE);

        let mut files: Vec<PathBuf> = builder
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|entry| self.has_indexed_extension(entry.path()))
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(Path::to_path_buf)
            })
            .collect();

        files.sort();
        files
    }

    fn has_indexed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.scan_config.extensions.iter().any(|e| e == ext))
    }

    /// Index the whole project from scratch.
    ///
    /// The vector store is cleared first so a rescan never duplicates slots.
    /// The description cache survives rescans; it decides per file whether
    /// the summarizer is asked again.
    pub fn scan(&mut self) -> Result<ScanStats> {
        let start = Instant::now();
        info!("Scanning {}", self.root.display());

        let mut store = VectorStore::load(&self.store_config);
        store
            .clear()
            .context("Failed to clear the vector store before rescanning")?;

        let mut cache = DescriptionCache::load(&self.store_config)
            .with_throttle_interval(self.scan_config.throttle_interval);
        let mut metadata = MetadataIndex::default();
        let mut tree = Vec::new();
        let mut stats = ScanStats::default();

        let files = self.collect_files();
        info!("Found {} source files", files.len());

        for relative in files {
            stats.files += 1;
            let rel_path = to_slash_path(&relative);
            let code = match fs::read(self.root.join(&relative)) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!("Failed to read {}: {}", rel_path, e);
                    stats.read_failures += 1;
                    String::new()
                }
            };

            let description = self.describe(&mut cache, &rel_path, &code, &mut stats)?;

            let symbols = self
                .parser
                .extract(&relative, &code)
                .unwrap_or_else(|e| {
                    warn!("Failed to extract symbols from {}: {:#}", rel_path, e);
                    Symbols::default()
                });
            debug!(
                "{}: {} functions, {} classes",
                rel_path,
                symbols.functions.len(),
                symbols.classes.len()
            );
            metadata.push(FileMetadata::new(rel_path.clone(), symbols));

            match self.embedder.embed(&description) {
                Ok(embedding) => match store.add(&embedding, &rel_path, false) {
                    Ok(_) => stats.embedded += 1,
                    Err(e) => {
                        warn!("Failed to index {}: {}", rel_path, e);
                        stats.embedding_failures += 1;
                    }
                },
                Err(e) => {
                    warn!("Failed to embed summary of {}: {:#}", rel_path, e);
                    stats.embedding_failures += 1;
                }
            }

            tree.push(TreeEntry::new(rel_path, description));
        }

        store.persist().context("Failed to persist the vector store")?;
        metadata
            .save(&self.store_config)
            .context("Failed to save symbol metadata")?;

        let structure = render_tree(&self.root_name(), &tree);
        persist::write_atomic(&self.store_config.structure_path(), structure.as_bytes())
            .context("Failed to write structure overview")?;

        info!(
            "Scan finished in {:.2}s: {} files, {} embedded, {} summarized, {} reused",
            start.elapsed().as_secs_f64(),
            stats.files,
            stats.embedded,
            stats.summarized,
            stats.reused
        );
        Ok(stats)
    }

    /// Description for one file under the cache policy. Every visit touches
    /// the cache so the access count advances towards the next refresh.
    fn describe(
        &self,
        cache: &mut DescriptionCache,
        rel_path: &str,
        code: &str,
        stats: &mut ScanStats,
    ) -> Result<String> {
        let description = match cache.get(rel_path) {
            Some(cached) if !cache.should_refresh(rel_path) => {
                stats.reused += 1;
                cached.to_string()
            }
            _ => {
                let excerpt: String = code.chars().take(self.scan_config.excerpt_chars).collect();
                match self.summarizer.summarize(rel_path, &excerpt) {
                    Ok(summary) => {
                        stats.summarized += 1;
                        summary
                    }
                    Err(e) => {
                        warn!("Summary for {} failed, using first line: {:#}", rel_path, e);
                        stats.fallbacks += 1;
                        fallback_description(code)
                    }
                }
            }
        };

        cache
            .touch(rel_path, &description)
            .with_context(|| format!("Failed to update description cache for {}", rel_path))?;
        Ok(description)
    }

    fn root_name(&self) -> String {
        self.root
            .canonicalize()
            .ok()
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| ".".to_string())
    }
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
