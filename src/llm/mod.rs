// Collaborators: embedding and text generation
// The retrieval core only sees the traits below. Provider details such as
// response shapes stay inside the adapters.

use anyhow::Result;

pub mod config;
pub mod context;
pub mod gemini;
pub mod hash;
pub mod ollama;
pub mod proposal;
pub mod summarizer;

pub use config::LLMConfig;
pub use context::ContextCollector;
pub use gemini::GeminiClient;
pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;
pub use proposal::{parse_proposals, FileProposal, SYSTEM_PROMPT};
pub use summarizer::{fallback_description, FirstLineSummarizer, LlmSummarizer};

/// Turns text into one fixed-dimension vector
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Produces a short natural-language description of a source file
pub trait Summarizer {
    fn summarize(&self, file_path: &str, code_excerpt: &str) -> Result<String>;
}

/// Plain system + user prompt completion
pub trait ChatModel {
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

impl<T: Embedder + ?Sized> Embedder for &T {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }
}

impl<T: Summarizer + ?Sized> Summarizer for &T {
    fn summarize(&self, file_path: &str, code_excerpt: &str) -> Result<String> {
        (**self).summarize(file_path, code_excerpt)
    }
}

impl<T: Summarizer + ?Sized> Summarizer for Box<T> {
    fn summarize(&self, file_path: &str, code_excerpt: &str) -> Result<String> {
        (**self).summarize(file_path, code_excerpt)
    }
}

impl<T: ChatModel + ?Sized> ChatModel for &T {
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        (**self).generate(system_prompt, user_prompt)
    }
}

impl<T: ChatModel + ?Sized> ChatModel for Box<T> {
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        (**self).generate(system_prompt, user_prompt)
    }
}
