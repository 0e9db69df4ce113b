// One-sentence file summaries for the description cache

use anyhow::{bail, Result};

use super::{ChatModel, Summarizer};

const SUMMARY_SYSTEM_PROMPT: &str = "You are an experienced software engineer. \
Summarize the purpose of the given source file in one sentence. \
Answer with the sentence only.";

/// Longest first line kept by the fallback description
const FALLBACK_MAX_CHARS: usize = 120;

/// Summarizer backed by any chat model
pub struct LlmSummarizer<C> {
    model: C,
}

impl<C: ChatModel> LlmSummarizer<C> {
    pub fn new(model: C) -> Self {
        Self { model }
    }
}

impl<C: ChatModel> Summarizer for LlmSummarizer<C> {
    fn summarize(&self, file_path: &str, code_excerpt: &str) -> Result<String> {
        let user_prompt = format!("File: {}\n\nCode:\n{}", file_path, code_excerpt);
        let answer = self.model.generate(SUMMARY_SYSTEM_PROMPT, &user_prompt)?;

        // Keep it on one line so it fits the structure overview
        let summary = answer.split_whitespace().collect::<Vec<_>>().join(" ");
        if summary.is_empty() {
            bail!("Model returned an empty summary for {}", file_path);
        }
        Ok(summary)
    }
}

/// Offline summarizer: describes a file by its first line
pub struct FirstLineSummarizer;

impl Summarizer for FirstLineSummarizer {
    fn summarize(&self, _file_path: &str, code_excerpt: &str) -> Result<String> {
        Ok(fallback_description(code_excerpt))
    }
}

/// Description used when summarization fails: the first non-blank line,
/// truncated, or `(empty)` for files without content.
pub fn fallback_description(code: &str) -> String {
    match code.lines().map(str::trim).find(|line| !line.is_empty()) {
        Some(line) => {
            let truncated: String = line.chars().take(FALLBACK_MAX_CHARS).collect();
            format!("{}...", truncated)
        }
        None => "(empty)".to_string(),
    }
}
