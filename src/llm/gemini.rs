// Gemini API text generation (blocking)
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{ChatModel, LLMConfig};

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

fn extract_text(response: GeminiResponse) -> Result<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .context("Gemini response has no candidates")?
        .content
        .parts
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    let text = text.trim();
    if text.is_empty() {
        bail!("Gemini response contains no text");
    }
    Ok(text.to_string())
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn from_config(api_key: String, config: &LLMConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            model: config.model_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl ChatModel for GeminiClient {
    fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let start = Instant::now();
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model,
            urlencoding::encode(&self.api_key)
        );

        debug!("Calling Gemini (model: {})", self.model);

        let request = GeminiRequest {
            system_instruction: (!system_prompt.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: user_prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .context("Gemini API request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            bail!("Gemini API error ({}): {}", status, error_text);
        }

        let gemini_response: GeminiResponse = response
            .json()
            .context("Failed to parse Gemini API response")?;
        let text = extract_text(gemini_response)?;

        info!(
            "Gemini answered with {} chars in {:.2}s",
            text.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(text)
    }
}
