//! Playground configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `PLAYGROUND_*` environment variables. Binaries apply their own flags on
//! top of the result.
//!
//! ```toml
//! settle_window_ms = 1000
//! field_settle_window_ms = 500
//! evaluator_timeout_ms = 30000
//! evaluator_command = ["preview-evaluator", "--stdin"]
//! max_share_bytes = 1024000
//! share_dir = ".playground/share"
//! bind = "127.0.0.1:8787"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest template accepted for sharing, in serialized bytes.
pub const DEFAULT_MAX_SHARE_BYTES: usize = 1024 * 1000;

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "PLAYGROUND_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaygroundConfig {
    /// Quiet period after a template edit before recomputing.
    pub settle_window_ms: u64,
    /// Quiet period after a field edit before recomputing.
    pub field_settle_window_ms: u64,
    /// Bound on one evaluator call; 0 disables the bound.
    pub evaluator_timeout_ms: u64,
    /// Program and arguments of the external evaluator.
    pub evaluator_command: Vec<String>,
    pub max_share_bytes: usize,
    pub share_dir: PathBuf,
    pub bind: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            settle_window_ms: 1000,
            field_settle_window_ms: 500,
            evaluator_timeout_ms: 30_000,
            evaluator_command: Vec::new(),
            max_share_bytes: DEFAULT_MAX_SHARE_BYTES,
            share_dir: PathBuf::from(".playground/share"),
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

impl PlaygroundConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Defaults, overlaid with `path` when given, overlaid with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `PLAYGROUND_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = var("SETTLE_WINDOW_MS") {
            self.settle_window_ms = parse_env(key, value)?;
        }
        if let Some((key, value)) = var("FIELD_SETTLE_WINDOW_MS") {
            self.field_settle_window_ms = parse_env(key, value)?;
        }
        if let Some((key, value)) = var("EVALUATOR_TIMEOUT_MS") {
            self.evaluator_timeout_ms = parse_env(key, value)?;
        }
        if let Some((_, value)) = var("EVALUATOR_COMMAND") {
            self.evaluator_command = value.split_whitespace().map(str::to_string).collect();
        }
        if let Some((key, value)) = var("MAX_SHARE_BYTES") {
            self.max_share_bytes = parse_env(key, value)?;
        }
        if let Some((_, value)) = var("SHARE_DIR") {
            self.share_dir = PathBuf::from(value);
        }
        if let Some((_, value)) = var("BIND") {
            self.bind = value;
        }
        Ok(())
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn field_settle_window(&self) -> Duration {
        Duration::from_millis(self.field_settle_window_ms)
    }

    /// `None` when timeouts are disabled.
    pub fn evaluator_timeout(&self) -> Option<Duration> {
        (self.evaluator_timeout_ms > 0).then(|| Duration::from_millis(self.evaluator_timeout_ms))
    }
}

fn parse_env<T: std::str::FromStr>(key: String, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}
