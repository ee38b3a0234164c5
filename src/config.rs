//! Loading `config.toml` and environment overrides
//!
//! Resolution for each setting (highest first):
//!   1. CLI flag (applied by the binary after `load`)
//!   2. environment variable
//!   3. `config.toml` in the Srishti home directory
//!   4. built-in default

use crate::{Result, SrishtiConfig, SrishtiError};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Environment variable overriding the home directory
pub const HOME_ENV: &str = "SRISHTI_HOME";

/// `config.toml` contents; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub memory_model: Option<String>,
    pub base_url: Option<String>,
    pub history_window: Option<usize>,
    pub memory_window: Option<usize>,
    pub extraction_interval: Option<usize>,
    pub memory_capacity: Option<usize>,
    pub auto_learning: Option<bool>,
    pub strict_auth: Option<bool>,
    pub max_attempts: Option<u32>,
    pub request_timeout_secs: Option<u64>,
}

impl ConfigToml {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Overlay file values onto `config`
    fn apply(self, mut config: SrishtiConfig) -> SrishtiConfig {
        if let Some(key) = self.api_key.filter(|k| !k.trim().is_empty()) {
            config.api_key = Some(key);
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(model) = self.memory_model {
            config.memory_model = model;
        }
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if let Some(n) = self.history_window {
            config.history_window = n;
        }
        if let Some(n) = self.memory_window {
            config.memory_window = n;
        }
        if let Some(n) = self.extraction_interval {
            config.extraction_interval = n;
        }
        if let Some(n) = self.memory_capacity {
            config.memory_capacity = n;
        }
        if let Some(on) = self.auto_learning {
            config.auto_learning = on;
        }
        if let Some(strict) = self.strict_auth {
            config.strict_auth = strict;
        }
        if let Some(n) = self.max_attempts {
            config.max_attempts = n;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        config
    }
}

/// Resolve the Srishti home directory (`$SRISHTI_HOME` or `~/.srishti`)
pub fn default_home() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| SrishtiError::Config("could not find home directory".to_string()))?;
    Ok(home.join(".srishti"))
}

/// Load configuration for `home`: defaults, then file, then environment
pub async fn load(home: &Path) -> Result<SrishtiConfig> {
    let mut config = SrishtiConfig::new(home.to_path_buf());
    let config_file = config.config_file();

    if config_file.exists() {
        let content = tokio::fs::read_to_string(&config_file).await?;
        let file = ConfigToml::parse(&content).map_err(|e| {
            SrishtiError::Config(format!("{}: {e}", config_file.display()))
        })?;
        config = file.apply(config);
        debug!("Loaded {}", config_file.display());
    }

    config = apply_env(config, |name| std::env::var(name).ok());
    validate(&config)?;

    info!(
        "Config resolved: model='{}', memory_model='{}', windows={}/{}, extraction_every={}, key_selected={}",
        config.model,
        config.memory_model,
        config.history_window,
        config.memory_window,
        config.extraction_interval,
        config.api_key.is_some()
    );

    Ok(config)
}

/// Apply environment overrides read through `lookup`
fn apply_env(mut config: SrishtiConfig, lookup: impl Fn(&str) -> Option<String>) -> SrishtiConfig {
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty(API_KEY_ENV) {
        config.api_key = Some(key);
    }
    if let Some(model) = non_empty("SRISHTI_MODEL") {
        config.model = model;
    }
    if let Some(model) = non_empty("SRISHTI_MEMORY_MODEL") {
        config.memory_model = model;
    }
    if let Some(url) = non_empty("SRISHTI_BASE_URL") {
        config.base_url = url;
    }
    config
}

/// Reject settings that would break the windowing invariants
pub fn validate(config: &SrishtiConfig) -> Result<()> {
    if config.extraction_interval == 0 {
        return Err(SrishtiError::Config(
            "extraction_interval must be at least 1".to_string(),
        ));
    }
    if config.memory_capacity == 0 {
        return Err(SrishtiError::Config(
            "memory_capacity must be at least 1".to_string(),
        ));
    }
    if config.model.trim().is_empty() || config.memory_model.trim().is_empty() {
        return Err(SrishtiError::Config("model names must not be empty".to_string()));
    }
    Ok(())
}
