// src/core/config.rs
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = "ewise.toml";

/// Environment override for `kernel.backend`
pub const BACKEND_ENV: &str = "EWISE_BACKEND";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config encode error: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Which loop evaluates the output coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KernelBackend {
    /// Single-threaded walk over the output
    #[default]
    Scalar,
    /// Output split into chunks across the rayon pool
    Parallel,
}

impl std::str::FromStr for KernelBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" => Ok(KernelBackend::Scalar),
            "parallel" => Ok(KernelBackend::Parallel),
            other => Err(ConfigError::InvalidValue {
                key: "kernel.backend",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub backend: KernelBackend,
    /// Outputs with fewer elements always take the scalar path
    pub parallel_threshold: usize,
    /// Minimum number of output elements handed to one rayon task
    pub min_chunk: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            backend: KernelBackend::Scalar,
            parallel_threshold: 1 << 16,
            min_chunk: 4096,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// "display", "toon" or "json"
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "display".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub kernel: KernelConfig,
    pub output: OutputConfig,
}

impl EngineConfig {
    /// Load `ewise.toml` from the working directory, falling back to defaults
    /// (with a warning) when the file is missing or malformed.
    pub fn load() -> Self {
        let mut config = if Path::new(CONFIG_FILE).exists() {
            match Self::from_file(CONFIG_FILE) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("Ignoring {}: {}", CONFIG_FILE, e);
                    Self::default()
                }
            }
        } else {
            Self::default()
        };
        config.apply_env();
        config
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(BACKEND_ENV) {
            match value.parse() {
                Ok(backend) => self.kernel.backend = backend,
                Err(e) => log::warn!("Ignoring {}: {}", BACKEND_ENV, e),
            }
        }
    }
}
