// Configuration: storage locations and collaborator settings
// Loaded from <store_dir>/config.toml, defaults when the file is missing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AssistError;
use crate::llm::LLMConfig;

/// Name of the per-project store directory created inside the target project
pub const DEFAULT_STORE_DIR: &str = ".project-assistant";
pub const CONFIG_FILE: &str = "config.toml";

/// Where every persisted artifact lives
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    #[serde(skip)]
    pub dir: PathBuf,
    pub index_file: String,
    pub id_map_file: String,
    pub descriptions_file: String,
    pub metadata_file: String,
    pub structure_file: String,
    pub prompts_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_STORE_DIR),
            index_file: "vector.index".to_string(),
            id_map_file: "embeddings_map.json".to_string(),
            descriptions_file: "descriptions.json".to_string(),
            metadata_file: "metadata.json".to_string(),
            structure_file: "structure.md".to_string(),
            prompts_dir: "prompts".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(&self.index_file)
    }

    pub fn id_map_path(&self) -> PathBuf {
        self.dir.join(&self.id_map_file)
    }

    pub fn descriptions_path(&self) -> PathBuf {
        self.dir.join(&self.descriptions_file)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(&self.metadata_file)
    }

    pub fn structure_path(&self) -> PathBuf {
        self.dir.join(&self.structure_file)
    }

    pub fn prompts_path(&self) -> PathBuf {
        self.dir.join(&self.prompts_dir)
    }

    fn validate(&self) -> Result<(), AssistError> {
        let names = [
            ("index_file", &self.index_file),
            ("id_map_file", &self.id_map_file),
            ("descriptions_file", &self.descriptions_file),
            ("metadata_file", &self.metadata_file),
            ("structure_file", &self.structure_file),
            ("prompts_dir", &self.prompts_dir),
        ];
        for (key, name) in names {
            if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
                return Err(AssistError::Config(format!(
                    "store.{} must be a plain file name, got {:?}",
                    key, name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama server (`/api/embed`)
    Ollama,
    /// Offline feature hashing, no server needed
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: EmbeddingProvider,
    pub url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Only used by the hash provider
    pub hash_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Ollama,
            url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            timeout_secs: 60,
            hash_dimension: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// File extensions (without dot) that are indexed
    pub extensions: Vec<String>,
    /// A cached summary is recomputed when its access count is a multiple of this
    pub throttle_interval: u32,
    /// Characters of source handed to the summarizer
    pub excerpt_chars: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec![
                "py".to_string(),
                "rs".to_string(),
                "ts".to_string(),
                "tsx".to_string(),
            ],
            throttle_interval: 5,
            excerpt_chars: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl AppConfig {
    /// Load `<store_dir>/config.toml`, falling back to defaults when it doesn't exist
    pub fn load(store_dir: &Path) -> Result<Self> {
        let config_path = store_dir.join(CONFIG_FILE);

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str::<AppConfig>(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            AppConfig::default()
        };
        config.store.dir = store_dir.to_path_buf();

        config
            .validate()
            .context("Configuration validation failed")?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        fs::create_dir_all(&self.store.dir).with_context(|| {
            format!(
                "Failed to create store directory: {}",
                self.store.dir.display()
            )
        })?;

        let config_path = self.store.dir.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;
        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<(), AssistError> {
        self.store.validate()?;

        if self.scan.throttle_interval == 0 {
            return Err(AssistError::Config(
                "scan.throttle_interval must be at least 1".to_string(),
            ));
        }
        if self.scan.extensions.is_empty() {
            return Err(AssistError::Config(
                "scan.extensions must list at least one extension".to_string(),
            ));
        }
        if self.scan.excerpt_chars == 0 {
            return Err(AssistError::Config(
                "scan.excerpt_chars must be positive".to_string(),
            ));
        }
        if self.search.top_k == 0 {
            return Err(AssistError::Config(
                "search.top_k must be at least 1".to_string(),
            ));
        }
        if !(self.embedding.url.starts_with("http://") || self.embedding.url.starts_with("https://"))
        {
            return Err(AssistError::Config(format!(
                "embedding.url must start with http:// or https://, got {}",
                self.embedding.url
            )));
        }
        if self.embedding.model.trim().is_empty() {
            return Err(AssistError::Config(
                "embedding.model cannot be empty".to_string(),
            ));
        }
        if !(8..=4096).contains(&self.embedding.hash_dimension) {
            return Err(AssistError::Config(format!(
                "embedding.hash_dimension must be between 8 and 4096, got {}",
                self.embedding.hash_dimension
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(AssistError::Config(format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        Ok(())
    }
}
