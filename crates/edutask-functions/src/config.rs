//! functions.toml configuration parser.
//!
//! Declares the deployment policy (region, memory ceiling, instance
//! ceiling, timeout) and the CORS allow-list. Every key is optional and
//! falls back to the production values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use edutask_api::CorsPolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "functions.toml";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionsConfig {
    pub options: Option<OptionsConfig>,
    pub cors: Option<CorsConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsConfig {
    pub region: Option<String>,
    pub memory_mb: Option<u32>,
    pub max_instances: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allow_origins: Option<Vec<String>>,
    pub allow_credentials: Option<bool>,
}

/// Resolved deployment policy for the function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionOptions {
    pub region: String,
    /// Memory ceiling per instance, in MiB.
    pub memory_mb: u32,
    /// Maximum number of concurrently serving instances.
    pub max_instances: u32,
    /// Wall-clock ceiling per call.
    pub timeout: Duration,
}

impl Default for FunctionOptions {
    fn default() -> Self {
        Self {
            region: "asia-northeast3".to_string(),
            memory_mb: 256,
            max_instances: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

impl FunctionsConfig {
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, else `functions.toml` from the working
    /// directory if present, else the defaults.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Resolve and validate the deployment options.
    pub fn function_options(&self) -> ConfigResult<FunctionOptions> {
        let defaults = FunctionOptions::default();
        let Some(options) = &self.options else {
            return Ok(defaults);
        };

        let resolved = FunctionOptions {
            region: options.region.clone().unwrap_or(defaults.region),
            memory_mb: options.memory_mb.unwrap_or(defaults.memory_mb),
            max_instances: options.max_instances.unwrap_or(defaults.max_instances),
            timeout: options
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        };

        if resolved.region.trim().is_empty() {
            return Err(ConfigError::Invalid("region must not be empty".to_string()));
        }
        if resolved.memory_mb == 0 {
            return Err(ConfigError::Invalid("memory_mb must be > 0".to_string()));
        }
        if resolved.max_instances == 0 {
            return Err(ConfigError::Invalid("max_instances must be > 0".to_string()));
        }
        if resolved.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".to_string()));
        }
        Ok(resolved)
    }

    pub fn cors_policy(&self) -> CorsPolicy {
        let defaults = CorsPolicy::default();
        match &self.cors {
            None => defaults,
            Some(cors) => CorsPolicy::new(
                cors.allow_origins
                    .clone()
                    .unwrap_or_else(|| defaults.allow_origins().to_vec()),
                cors.allow_credentials
                    .unwrap_or(defaults.allow_credentials()),
            ),
        }
    }
}
