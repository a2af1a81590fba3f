//! Configuration file parsing and management

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = ".lastmile.toml";

/// Global configuration loaded from .lastmile.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the dispatch API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Per-driver route fetch timeout during fleet aggregation, in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Sorter shift target
    #[serde(default = "default_shift_goal")]
    pub shift_goal: u32,

    /// Regex a tracking number must match before it is sent for classification
    #[serde(default)]
    pub tracking_pattern: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            request_timeout: default_request_timeout(),
            fetch_timeout: default_fetch_timeout(),
            shift_goal: default_shift_goal(),
            tracking_pattern: None,
        }
    }
}

/// Runtime configuration for one CLI invocation
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
    pub fetch_timeout: Duration,
    pub shift_goal: u32,
    pub tracking_pattern: Option<Regex>,
}

impl TryFrom<Config> for RuntimeConfig {
    type Error = anyhow::Error;

    fn try_from(config: Config) -> Result<Self> {
        let tracking_pattern = config
            .tracking_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .context("Invalid tracking_pattern")?;

        Ok(Self {
            api_url: config.api_url,
            api_token: config.api_token,
            request_timeout: Duration::from_secs(config.request_timeout),
            fetch_timeout: Duration::from_secs(config.fetch_timeout),
            shift_goal: config.shift_goal,
            tracking_pattern,
        })
    }
}

impl RuntimeConfig {
    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.api_url = url;
        }
        self
    }

    pub fn with_api_token(mut self, token: Option<String>) -> Self {
        if token.is_some() {
            self.api_token = token;
        }
        self
    }
}

/// Load configuration from .lastmile.toml in the given directory
pub fn load_config(project_dir: &Path) -> Result<Config> {
    let config_path = project_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        tracing::debug!("No {} found, using defaults", CONFIG_FILE);
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", CONFIG_FILE, e))?;

    tracing::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}

// Default values
fn default_api_url() -> String { "http://localhost:8000".to_string() }
fn default_request_timeout() -> u64 { 30 }
fn default_fetch_timeout() -> u64 { 15 }
fn default_shift_goal() -> u32 { crate::sorting::DEFAULT_SHIFT_GOAL }
