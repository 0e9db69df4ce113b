// Hybrid retrieval over the project index

pub mod hybrid;
pub mod tokenizer;

pub use hybrid::{HybridSearcher, PassOutcome, SearchReport};
pub use tokenizer::tokenize;
