//! TOML configuration parsing and validation.
//!
//! Every section is optional. A config file only needs the keys that differ
//! from the defaults:
//!
//! ```toml
//! [endpoint]
//! base_url = "https://rag.example.com"
//! timeout_secs = 30
//!
//! [output]
//! format = "json"
//! show_passages = false
//! ```
//!
//! The answering service's base URL is resolved once, in the binary, and then
//! injected into the controller through [`EndpointConfig`]. Precedence is
//! `--api-url` flag, then the [`API_URL_ENV`] environment variable, then the
//! config file, then [`DEFAULT_BASE_URL`].

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides the configured base URL.
pub const API_URL_ENV: &str = "RAG_API_URL";

/// Local-development fallback for the answering service.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub show_passages: bool,
}

/// How views are written to stdout.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl EndpointConfig {
    /// Join a path onto the base URL without doubling slashes.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl Config {
    /// Apply the base URL override chain on top of the file value.
    ///
    /// `flag` comes from `--api-url`, `env` from [`API_URL_ENV`]. Empty
    /// strings are treated as unset.
    pub fn with_base_url_override(mut self, flag: Option<&str>, env: Option<&str>) -> Result<Self> {
        let chosen = [flag, env]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty());

        if let Some(url) = chosen {
            self.endpoint.base_url = url.to_string();
        }
        self.endpoint.base_url = self.endpoint.base_url.trim_end_matches('/').to_string();
        validate(&self)?;
        Ok(self)
    }
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the defaults.
///
/// Only used for the default `--config` path; a path the user typed
/// explicitly goes through [`load_config`] so a typo is reported.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    let url = config.endpoint.base_url.trim();
    if url.is_empty() {
        bail!("endpoint.base_url must not be empty");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!(
            "endpoint.base_url must start with http:// or https:// (got '{}')",
            url
        );
    }

    if config.endpoint.timeout_secs == 0 {
        bail!("endpoint.timeout_secs must be > 0");
    }

    Ok(())
}
