use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "CONCRETE_WHATIF_CONFIG";

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "whatif.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Settings threaded through preparation, fitting and the what-if analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhatIfConfig {
    /// Full URL of the predict-and-optimize endpoint.
    pub backend_url: String,
    /// Strength the backend optimizes water content towards (MPa).
    pub target_strength: f64,
    /// Only rows measured at this curing age are kept.
    pub curing_age_days: f64,
    pub test_fraction: f64,
    /// Seed for the train/test shuffle.
    pub seed: u64,
    /// Ridge penalty of the linear model; 0 means plain least squares.
    pub ridge_alpha: f64,
    pub request_timeout_secs: u64,
    pub dataset_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
}

impl Default for WhatIfConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000/predict".to_string(),
            target_strength: 40.0,
            curing_age_days: 28.0,
            test_fraction: 0.2,
            seed: 42,
            ridge_alpha: 0.0,
            request_timeout_secs: 30,
            dataset_path: None,
            model_path: None,
        }
    }
}

/// On-disk form of the config: every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    pub backend_url: Option<String>,
    pub target_strength: Option<f64>,
    pub curing_age_days: Option<f64>,
    pub test_fraction: Option<f64>,
    pub seed: Option<u64>,
    pub ridge_alpha: Option<f64>,
    pub request_timeout_secs: Option<u64>,
    pub dataset_path: Option<PathBuf>,
    pub model_path: Option<PathBuf>,
}

impl WhatIfConfig {
    // merge where the partial config overwrites self
    pub fn merge(self, other: PartialConfig) -> Self {
        Self {
            backend_url: other.backend_url.unwrap_or(self.backend_url),
            target_strength: other.target_strength.unwrap_or(self.target_strength),
            curing_age_days: other.curing_age_days.unwrap_or(self.curing_age_days),
            test_fraction: other.test_fraction.unwrap_or(self.test_fraction),
            seed: other.seed.unwrap_or(self.seed),
            ridge_alpha: other.ridge_alpha.unwrap_or(self.ridge_alpha),
            request_timeout_secs: other.request_timeout_secs.unwrap_or(self.request_timeout_secs),
            dataset_path: other.dataset_path.or(self.dataset_path),
            model_path: other.model_path.or(self.model_path),
        }
    }

    /// Parse TOML text on top of the defaults.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let partial: PartialConfig = toml::from_str(text)?;
        let config = Self::default().merge(partial);
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// `$CONCRETE_WHATIF_CONFIG`, else `./whatif.toml` if present, else defaults.
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::load(local);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_strength.is_finite() && self.target_strength > 0.0) {
            return Err(ConfigError::Invalid {
                key: "target_strength",
                reason: format!("must be a positive number of MPa, got {}", self.target_strength),
            });
        }
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::Invalid {
                key: "test_fraction",
                reason: format!("must lie strictly between 0 and 1, got {}", self.test_fraction),
            });
        }
        if !(self.ridge_alpha.is_finite() && self.ridge_alpha >= 0.0) {
            return Err(ConfigError::Invalid {
                key: "ridge_alpha",
                reason: format!("must be a non-negative number, got {}", self.ridge_alpha),
            });
        }
        if self.backend_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "backend_url",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
