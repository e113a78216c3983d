//! Configuration management for Parlance
//!
//! This module handles loading, parsing, and validating configuration
//! from YAML files, with defaults suitable for talking to an
//! OpenAI-compatible endpoint.

use crate::error::{ParlanceError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Parlance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion-client configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Moderation gate configuration
    #[serde(default)]
    pub moderation: ModerationConfig,

    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Interactive chat configuration
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Completion-client configuration
///
/// Specifies which backend to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of backend to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI-compatible backend configuration
    #[serde(default)]
    pub openai: OpenAiConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
        }
    }
}

/// OpenAI-compatible backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model to request completions from
    #[serde(default = "default_model")]
    pub model: String,

    /// Optional API base URL (useful for tests and local mocks)
    ///
    /// When set, this base is used to build the `/chat/completions`
    /// endpoint, which allows tests to point the client at a mock server.
    #[serde(default)]
    pub api_base: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: None,
            api_key_env: default_api_key_env(),
        }
    }
}

/// Moderation gate configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Whether turns are auto-moderated by default
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Optional API base URL for the moderations endpoint
    #[serde(default)]
    pub api_base: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_true() -> bool {
    true
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: None,
            api_key_env: default_api_key_env(),
        }
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether sessions consult and fill the cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Backing file for the cache store; defaults to the user data dir
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl CacheConfig {
    /// Resolve the backing file path, falling back to the user data dir
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let dirs = ProjectDirs::from("dev", "parlance", "parlance").ok_or_else(|| {
            ParlanceError::Config("Could not determine data directory".to_string())
        })?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        Ok(data_dir.join("responses.json"))
    }
}

/// Interactive chat configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// System prompt appended to a fresh session before the first turn
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Examples
    ///
    /// ```
    /// use parlance::config::Config;
    ///
    /// let config = Config::load("does-not-exist.yaml").unwrap();
    /// assert_eq!(config.provider.provider_type, "openai");
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error when the provider type is unknown, the model name is
    /// empty, or the cache path has an unsupported extension.
    pub fn validate(&self) -> Result<()> {
        if self.provider.provider_type != "openai" {
            return Err(ParlanceError::Config(format!(
                "Unknown provider type: {}",
                self.provider.provider_type
            ))
            .into());
        }

        if self.provider.openai.model.trim().is_empty() {
            return Err(ParlanceError::Config("Model name must not be empty".to_string()).into());
        }

        if let Some(path) = &self.cache.path {
            crate::persist::FileFormat::from_path(path)?;
        }

        Ok(())
    }
}
