// Hybrid file retrieval: keyword pass over symbol metadata + vector pass over
// summary embeddings, merged by union.

use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

use super::tokenizer::tokenize;
use crate::config::StoreConfig;
use crate::error::{AssistError, Result};
use crate::llm::Embedder;
use crate::metadata::{FileMetadata, MetadataIndex};
use crate::vector_store::VectorStore;

/// Result of one retrieval pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    Matched(BTreeSet<String>),
    /// The pass could not run; the reason is shown to the user
    Unavailable(String),
}

impl PassOutcome {
    pub fn files(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Matched(files) => Some(files),
            Self::Unavailable(_) => None,
        }
    }

    fn len(&self) -> usize {
        self.files().map_or(0, BTreeSet::len)
    }
}

/// Both pass outcomes plus the merged, sorted file list
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub keyword: PassOutcome,
    pub vector: PassOutcome,
    pub files: Vec<String>,
}

pub struct HybridSearcher<E> {
    store: VectorStore,
    metadata: MetadataIndex,
    embedder: E,
}

impl<E: Embedder> HybridSearcher<E> {
    pub fn new(store: VectorStore, metadata: MetadataIndex, embedder: E) -> Self {
        Self {
            store,
            metadata,
            embedder,
        }
    }

    /// Load the vector store and metadata from disk. Missing artifacts give an
    /// empty searcher rather than an error.
    pub fn open(config: &StoreConfig, embedder: E) -> Self {
        Self::new(
            VectorStore::load(config),
            MetadataIndex::load(config),
            embedder,
        )
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn metadata(&self) -> &MetadataIndex {
        &self.metadata
    }

    /// Files relevant to `query`, sorted lexicographically.
    ///
    /// A failing pass only shrinks the result; `top_k == 0` is the only error.
    pub fn find_relevant(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self.search_report(query, top_k)?.files)
    }

    pub fn search_report(&self, query: &str, top_k: usize) -> Result<SearchReport> {
        if top_k == 0 {
            return Err(AssistError::InvalidArgument(
                "top_k must be at least 1".to_string(),
            ));
        }

        let keyword = self.keyword_pass(query);
        let vector = self.vector_pass(query, top_k);

        for (name, outcome) in [("Keyword", &keyword), ("Vector", &vector)] {
            match outcome {
                PassOutcome::Matched(files) => debug!("{} pass: {} files", name, files.len()),
                PassOutcome::Unavailable(reason) => warn!("{} pass unavailable: {}", name, reason),
            }
        }

        let merged: BTreeSet<String> = keyword
            .files()
            .into_iter()
            .chain(vector.files())
            .flatten()
            .cloned()
            .collect();
        let files: Vec<String> = merged.into_iter().collect();

        info!(
            "Found {} relevant files ({} keyword, {} vector)",
            files.len(),
            keyword.len(),
            vector.len()
        );

        Ok(SearchReport {
            keyword,
            vector,
            files,
        })
    }

    fn keyword_pass(&self, query: &str) -> PassOutcome {
        if self.metadata.is_empty() {
            return PassOutcome::Unavailable("no symbol metadata, run `scan` first".to_string());
        }

        let lowered = query.to_lowercase();
        let query_tokens = tokenize(query);

        let matches = self
            .metadata
            .records()
            .iter()
            .filter(|record| {
                let file = record.file.to_lowercase();
                if !file.is_empty() && lowered.contains(&file) {
                    return true;
                }
                !query_tokens.is_empty()
                    && record_tokens(record)
                        .iter()
                        .any(|token| query_tokens.contains(token))
            })
            .map(|record| record.file.clone())
            .collect();

        PassOutcome::Matched(matches)
    }

    fn vector_pass(&self, query: &str, top_k: usize) -> PassOutcome {
        if self.store.is_empty() {
            return PassOutcome::Unavailable("vector store is empty".to_string());
        }

        let embedding = match self.embedder.embed(query) {
            Ok(embedding) => embedding,
            Err(e) => return PassOutcome::Unavailable(format!("embedding failed: {:#}", e)),
        };

        match self.store.search(&embedding, top_k) {
            Ok(hits) => {
                for hit in &hits {
                    debug!("  {} (distance {:.4})", hit.file_path, hit.distance);
                }
                PassOutcome::Matched(hits.into_iter().map(|hit| hit.file_path).collect())
            }
            Err(e) => PassOutcome::Unavailable(e.to_string()),
        }
    }
}

/// Lowercased path components, file stem, function and class names
fn record_tokens(record: &FileMetadata) -> BTreeSet<String> {
    let file = record.file.to_lowercase();
    let mut tokens: BTreeSet<String> = file
        .split(|c| c == '/' || c == '\\')
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(stem) = Path::new(&file).file_stem().and_then(|s| s.to_str()) {
        tokens.insert(stem.to_string());
    }

    tokens.extend(
        record
            .functions
            .iter()
            .chain(&record.classes)
            .map(|name| name.to_lowercase()),
    );
    tokens
}
