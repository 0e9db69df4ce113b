// Ollama embedding adapter (POST /api/embed)

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::Embedder;
use crate::config::EmbeddingConfig;

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

/// Ollama has answered with both a batch (`[[..]]`) and a flat (`[..]`) list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingShape {
    Batch(Vec<Vec<f32>>),
    Single(Vec<f32>),
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Option<EmbeddingShape>,
    #[serde(default)]
    embedding: Option<EmbeddingShape>,
}

/// Reduce any accepted response shape to the first embedding vector
fn parse_embed_response(body: &str) -> Result<Vec<f32>> {
    let response: EmbedResponse =
        serde_json::from_str(body).context("Failed to parse embedding response")?;

    let shape = response
        .embeddings
        .or(response.embedding)
        .ok_or_else(|| anyhow!("Embedding response has no 'embeddings' or 'embedding' field"))?;

    let vector = match shape {
        EmbeddingShape::Batch(batch) => batch
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Embedding response contains an empty batch"))?,
        EmbeddingShape::Single(vector) => vector,
    };

    if vector.is_empty() {
        bail!("Embedding response contains an empty vector");
    }
    Ok(vector)
}

pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: format!("{}/api/embed", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Embedder for OllamaEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Requesting embedding ({} chars) from {}", text.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .with_context(|| format!("Embedding request to {} failed", self.endpoint))?;

        let status = response.status();
        let body = response
            .text()
            .context("Failed to read embedding response body")?;
        if !status.is_success() {
            bail!("Ollama returned {} for model '{}': {}", status, self.model, body);
        }

        parse_embed_response(&body)
    }
}
