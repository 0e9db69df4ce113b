// Prompt assembly for `ask`: project overview + relevant sources + request

use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::parser::SourceLanguage;
use crate::persist;

pub struct ContextCollector {
    project_root: PathBuf,
    store: StoreConfig,
}

impl ContextCollector {
    pub fn new(project_root: &Path, store: &StoreConfig) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            store: store.clone(),
        }
    }

    /// Build the user prompt for `query` from the saved structure overview
    /// and the contents of `files` (paths relative to the project root).
    /// Files that can no longer be read are left out.
    pub fn build_prompt(&self, query: &str, files: &[String]) -> String {
        let mut prompt = String::new();

        prompt.push_str("## Project structure\n\n");
        match fs::read_to_string(self.store.structure_path()) {
            Ok(structure) => {
                prompt.push_str("```\n");
                prompt.push_str(structure.trim_end());
                prompt.push_str("\n```\n\n");
            }
            Err(_) => prompt.push_str("(not available, run `scan` first)\n\n"),
        }

        prompt.push_str("## Relevant files\n\n");
        let mut included = 0;
        for file in files {
            let path = self.project_root.join(file);
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping {} in prompt: {}", file, e);
                    continue;
                }
            };
            let content = String::from_utf8_lossy(&bytes);
            let tag = SourceLanguage::from_path(&path)
                .map(|language| language.fence_tag())
                .unwrap_or("");

            prompt.push_str(&format!("### {}\n\n```{}\n", file, tag));
            prompt.push_str(content.trim_end());
            prompt.push_str("\n```\n\n");
            included += 1;
        }
        if included == 0 {
            prompt.push_str("(no relevant files found)\n\n");
        }

        prompt.push_str("## User request\n\n");
        prompt.push_str(query.trim());
        prompt.push('\n');

        debug!("Built prompt with {} files ({} chars)", included, prompt.len());
        prompt
    }

    /// Save `prompt` under `<store>/prompts/prompt-YYYYMMDD-HHMMSS.md`
    pub fn archive_prompt(&self, prompt: &str) -> Result<PathBuf> {
        let name = format!("prompt-{}.md", Local::now().format("%Y%m%d-%H%M%S"));
        let path = self.store.prompts_path().join(name);
        persist::write_atomic(&path, prompt.as_bytes())
            .with_context(|| format!("Failed to archive prompt to {}", path.display()))?;
        debug!("Archived prompt to {}", path.display());
        Ok(path)
    }
}
