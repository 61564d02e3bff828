use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides the data directory (~/.snipsearch)
pub const HOME_ENV: &str = "SNIPSEARCH_HOME";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of snippets returned when `--top-k` is not given
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,
}

/// Settings handed to the embedding provider at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Hugging Face repository the ONNX model and tokenizer are fetched from
    #[serde(default = "default_model_repo")]
    pub model_repo: String,

    #[serde(default)]
    pub pooling: Pooling,

    /// Longer inputs are embedded in overlapping windows
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Prepended to search queries before embedding. Empty disables it.
    #[serde(default)]
    pub query_instruction: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// Hidden state of the first ([CLS]) token
    #[default]
    Cls,
    /// Attention-mask weighted mean over all tokens
    Mean,
}

/// Settings for the answer-synthesis LLM (Ollama)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_top_k() -> usize {
    1
}
fn default_model_repo() -> String {
    "BAAI/bge-base-en-v1.5".to_string()
}
fn default_max_tokens() -> usize {
    512
}
fn default_llm_endpoint() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    "llama3".to_string()
}
fn default_request_timeout_secs() -> u64 {
    360
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_repo: default_model_repo(),
            pooling: Pooling::default(),
            max_tokens: default_max_tokens(),
            query_instruction: String::new(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path()?)
    }

    /// Loads the config at `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config = toml::from_str(&content).context("Failed to parse config")?;
        if config.default_top_k < 1 {
            anyhow::bail!("default_top_k must be at least 1");
        }
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }
}

/// Data directory: $SNIPSEARCH_HOME, or ~/.snipsearch
pub fn snipsearch_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".snipsearch"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(snipsearch_dir()?.join("config.toml"))
}

pub fn db_path() -> Result<PathBuf> {
    Ok(snipsearch_dir()?.join("snippets.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.default_top_k, 1);
        assert_eq!(config.embedding.model_repo, "BAAI/bge-base-en-v1.5");
        assert_eq!(config.embedding.pooling, Pooling::Cls);
        assert_eq!(config.llm.model, "llama3");
        assert_eq!(config.llm.request_timeout_secs, 360);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "default_top_k = 5\n\n[embedding]\npooling = \"mean\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.default_top_k, 5);
        assert_eq!(config.embedding.pooling, Pooling::Mean);
        assert_eq!(config.embedding.max_tokens, 512);
        assert_eq!(config.llm.endpoint, "http://localhost:11434");
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "default_top_k = 0\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.llm.model = "codellama".to_string();

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.llm.model, "codellama");
    }
}
