// project-assistant library entry point
// Hybrid retrieval core (vector store, description cache, searcher) plus the
// scanner and collaborator adapters the CLI is built from.

pub mod config;
pub mod description_cache;
pub mod error;
pub mod error_helper;
pub mod metadata;
pub mod parser;
pub mod persist;
pub mod reporter;
pub mod scanner;
pub mod structure;
pub mod vector_store;

// LLM and embedding collaborators
pub mod llm;

// Retrieval
pub mod search;

// Re-exports
pub use config::{AppConfig, StoreConfig};
pub use description_cache::DescriptionCache;
pub use error::{AssistError, Result};
pub use metadata::{FileMetadata, MetadataIndex};
pub use scanner::{ProjectScanner, ScanStats};
pub use search::{HybridSearcher, PassOutcome, SearchReport};
pub use vector_store::{VectorHit, VectorStore};
