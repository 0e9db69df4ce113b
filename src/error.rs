// Error types shared by the retrieval core (vector store, description cache, searcher)

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistError>;

#[derive(Error, Debug)]
pub enum AssistError {
    /// Caller passed a value the operation can never accept (e.g. `top_k == 0`)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Vector length differs from the dimension fixed by the first insert
    #[error("Dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AssistError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }
}
