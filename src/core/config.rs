//! Application configuration management
//!
//! This module handles loading and validating configuration from TOML files.
//! All configuration is validated at startup so a misconfigured run fails
//! before any request is sent.

use crate::checks::CheckSettings;
use crate::core::constants::{defaults, limits};
use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: default_api_key(),
            request_timeout: default_request_timeout(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_n")]
    pub n: u32,
    #[serde(default = "default_echo")]
    pub echo: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            prompt: default_prompt(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            n: default_n(),
            echo: default_echo(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_base_url() -> String {
    defaults::BASE_URL.to_string()
}

fn default_api_key() -> String {
    defaults::API_KEY.to_string()
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT
}

fn default_log_level() -> String {
    defaults::LOG_LEVEL.to_string()
}

fn default_model() -> String {
    defaults::MODEL.to_string()
}

fn default_prompt() -> String {
    defaults::PROMPT.to_string()
}

fn default_max_tokens() -> u32 {
    defaults::MAX_TOKENS
}

fn default_temperature() -> f32 {
    defaults::TEMPERATURE
}

fn default_top_p() -> f32 {
    defaults::TOP_P
}

fn default_n() -> u32 {
    defaults::N
}

fn default_echo() -> bool {
    defaults::ECHO
}

fn default_batch_size() -> usize {
    defaults::BATCH_SIZE
}

/// Application configuration loaded from a TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub check: CheckConfig,
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The TOML file cannot be read or parsed
    /// - Configuration values are invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;

        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit path or `config.toml`
    ///
    /// An explicit path must exist. Without one, `config.toml` is read when
    /// present and built-in defaults are used otherwise.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        let base_url = self.server.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!(
                "server.base_url must start with http:// or https://, got '{}'",
                self.server.base_url
            );
        }
        ensure!(self.server.request_timeout > 0, "server.request_timeout must be positive");

        let check = &self.check;
        ensure!(!check.model.trim().is_empty(), "check.model must not be empty");
        ensure!(!check.prompt.is_empty(), "check.prompt must not be empty");
        ensure!(check.max_tokens > 0, "check.max_tokens must be positive");
        ensure!(
            (1..=limits::MAX_N).contains(&check.n),
            "check.n must be within [1, {}], got {}",
            limits::MAX_N,
            check.n
        );
        ensure!(
            (1..=limits::MAX_BATCH_SIZE).contains(&check.batch_size),
            "check.batch_size must be within [1, {}], got {}",
            limits::MAX_BATCH_SIZE,
            check.batch_size
        );
        ensure!(
            (0.0..=2.0).contains(&check.temperature),
            "check.temperature must be within [0, 2], got {}",
            check.temperature
        );
        ensure!(
            check.top_p > 0.0 && check.top_p <= 1.0,
            "check.top_p must be within (0, 1], got {}",
            check.top_p
        );

        Ok(())
    }

    /// Settings the checks run with
    pub fn check_settings(&self) -> CheckSettings {
        CheckSettings {
            model: self.check.model.clone(),
            prompt: self.check.prompt.clone(),
            max_tokens: self.check.max_tokens,
            temperature: self.check.temperature,
            top_p: self.check.top_p,
            n: self.check.n,
            echo: self.check.echo,
            batch_size: self.check.batch_size,
        }
    }
}
