use serde::{Deserialize, Serialize};

/// Text-generation settings shared by the summarizer and the `ask` command
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LLMConfig {
    pub model_name: String,
    /// Environment variable holding the API key (never stored in the config file)
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model_name: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            temperature: 0.2,
            max_tokens: 8192,
        }
    }
}

impl LLMConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}
