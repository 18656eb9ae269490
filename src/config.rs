//! Prospector configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::session::{SearchSettings, ws_endpoint};

/// Main prospector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// REST API connection
    pub api: ApiConfig,

    /// Streaming search behavior
    pub search: SearchConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(eyre::eyre!("api.base-url must not be empty"));
        }
        if self.search.limit == 0 {
            return Err(eyre::eyre!("search.limit must be positive"));
        }
        if self.search.partner_suggestion_limit == 0 {
            return Err(eyre::eyre!("search.partner-suggestion-limit must be positive"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .prospector.yml
        let local_config = PathBuf::from(".prospector.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/prospector/prospector.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("prospector").join("prospector.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Resolve the WebSocket search endpoint
    pub fn ws_endpoint(&self) -> String {
        ws_endpoint(&self.api.base_url, self.search.ws_url.as_deref())
    }

    /// Session settings derived from this config
    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            endpoint: self.ws_endpoint(),
            limit: self.search.limit,
            partner_suggestion_limit: self.search.partner_suggestion_limit,
            include_partner_suggestions: self.search.include_partner_suggestions,
            timeout: Duration::from_secs(self.search.timeout_secs),
        }
    }
}

/// REST API connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Streaming search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Explicit WebSocket endpoint; overrides the base-url derivation
    #[serde(rename = "ws-url")]
    pub ws_url: Option<String>,

    /// Results requested per search
    pub limit: u32,

    /// Partner suggestions requested per search
    #[serde(rename = "partner-suggestion-limit")]
    pub partner_suggestion_limit: u32,

    /// Whether to ask for partner suggestions at all
    #[serde(rename = "include-partner-suggestions")]
    pub include_partner_suggestions: bool,

    /// Overall search timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            ws_url: None,
            limit: 20,
            partner_suggestion_limit: 5,
            include_partner_suggestions: true,
            timeout_secs: 120,
        }
    }
}
