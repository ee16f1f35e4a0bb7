use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ToolsError};

/// Environment variable listing registries reached over plain HTTP (comma separated).
pub const INSECURE_REGISTRIES_ENV: &str = "A3S_INSECURE_REGISTRIES";

/// Imagetools configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagetoolsConfig {
    /// Protocol used to reach registries
    pub protocol: RegistryProtocol,

    /// Registries always reached over plain HTTP (e.g. "localhost:5000")
    pub insecure_registries: Vec<String>,

    /// Accept invalid TLS certificates
    pub accept_invalid_certificates: bool,

    /// Credential store location (defaults to ~/.a3s/auth/credentials.json)
    pub credentials_path: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    pub log_level: LogLevel,
}

impl Default for ImagetoolsConfig {
    fn default() -> Self {
        Self {
            protocol: RegistryProtocol::Https,
            insecure_registries: Vec::new(),
            accept_invalid_certificates: false,
            credentials_path: None,
            log_level: LogLevel::Warn,
        }
    }
}

impl ImagetoolsConfig {
    /// Default config file location (`~/.a3s/imagetools.yaml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".a3s").join("imagetools.yaml"))
    }

    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config");
        let data = std::fs::read_to_string(path).map_err(|e| {
            ToolsError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&data).map_err(|e| {
            ToolsError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration from an explicit path, or from the default location
    /// if it exists, then apply environment overrides.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path)?,
                _ => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env();
        Ok(config)
    }

    /// Merge registries listed in `A3S_INSECURE_REGISTRIES`.
    pub fn apply_env(&mut self) {
        if let Ok(value) = std::env::var(INSECURE_REGISTRIES_ENV) {
            self.add_insecure_registries(value.split(','));
        }
    }

    /// Add registries to the plain-HTTP list, skipping blanks and duplicates.
    pub fn add_insecure_registries<I, S>(&mut self, registries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for registry in registries {
            let registry = registry.as_ref().trim();
            if registry.is_empty() {
                continue;
            }
            if !self.insecure_registries.iter().any(|r| r == registry) {
                self.insecure_registries.push(registry.to_string());
            }
        }
    }
}

/// Registry transport protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryProtocol {
    Http,
    Https,
}

/// Log level
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
