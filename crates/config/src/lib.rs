//! Configuration management for the plan advisor
//!
//! Settings live in `~/.advisor/config.json`. Every field has a default, so a
//! missing file or a partial file is fine. The model API key is never stored
//! here; it is read from the environment variable named by
//! `model.api_key_env`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod paths;

pub use paths::{config_path, data_dir, sessions_dir};

/// Errors in configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config not found: {0}")]
    NotFound(PathBuf),

    #[error("{0} environment variable not set")]
    MissingApiKey(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Hosted model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            api_base: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

/// Reasoning loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Feed malformed model output back as an observation instead of failing
    #[serde(default = "default_true")]
    pub handle_parsing_errors: bool,
    /// Log the chain trace at info level
    #[serde(default = "default_true")]
    pub verbose: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            handle_parsing_errors: true,
            verbose: true,
        }
    }
}

fn default_max_iterations() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

/// Plan database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// File path or `sqlite:///` URI
    #[serde(default = "default_database")]
    pub path: String,
    /// Sample rows shown by the schema tool
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database(),
            sample_rows: default_sample_rows(),
        }
    }
}

fn default_database() -> String {
    "telecom.db".to_string()
}

fn default_sample_rows() -> usize {
    3
}

impl DatabaseConfig {
    /// Resolve the database file, accepting `sqlite:///relative` and
    /// `sqlite:////absolute` forms.
    pub fn file_path(&self) -> PathBuf {
        let path = self.path.as_str();
        match path.strip_prefix("sqlite:///") {
            Some(rest) => PathBuf::from(rest),
            None => PathBuf::from(path),
        }
    }
}

/// Code execution tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PythonConfig {
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PythonConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Tool configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolkitConfig {
    #[serde(default)]
    pub python: PythonConfig,
}

/// Chat transcript settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionConfig {
    /// Write transcripts to `~/.advisor/sessions`
    #[serde(default)]
    pub persist: bool,
}

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub toolkit: ToolkitConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// Load from the default location
    pub async fn load() -> Result<Self> {
        let path = config_path();
        Self::load_from(&path).await
    }

    /// Load from specific location
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        debug!("Loading config from {:?}", path);
        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save to the default location
    pub async fn save(&self) -> Result<()> {
        let path = config_path();
        self.save_to(&path).await
    }

    /// Save to specific location
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        debug!("Saving config to {:?}", path);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// API key from the environment, if set and non-empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.model.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// API key or `MissingApiKey`
    pub fn require_api_key(&self) -> Result<String> {
        self.api_key()
            .ok_or_else(|| ConfigError::MissingApiKey(self.model.api_key_env.clone()))
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    pub fn default_model(&self) -> String {
        self.model.model.clone()
    }

    pub fn database_path(&self) -> PathBuf {
        self.database.file_path()
    }

    pub fn max_iterations(&self) -> u32 {
        self.agent.max_iterations
    }
}

/// Write the default config (if absent) and create the data directories
pub async fn init() -> Result<Config> {
    let config_path = config_path();

    if config_path.exists() {
        warn!("Config already exists at {:?}", config_path);
    } else {
        let config = Config::default();
        config.save().await?;
        info!("Config written to {:?}", config_path);
    }

    let sessions = sessions_dir();
    paths::ensure_dir(&sessions).await?;
    info!("Sessions directory ready at {:?}", sessions);

    Config::load().await
}
