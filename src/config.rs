// Configuration loading and parsing (config/pollboard.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::results::PlaceholderMode;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub demo: DemoConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the poll backend, no trailing slash required.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DemoConfig {
    /// Fill placeholder result counts with random values instead of zeros.
    /// The results stay flagged as placeholders either way; this only makes
    /// demo screenshots less empty.
    pub randomized_placeholder_results: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backend: BackendConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.timeout_secs)
    }

    pub fn placeholder_mode(&self) -> PlaceholderMode {
        if self.demo.randomized_placeholder_results {
            PlaceholderMode::DemoRandom
        } else {
            PlaceholderMode::Zero
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load configuration from `config/pollboard.toml` under `base_dir`. A
/// missing file is not an error; defaults apply (local backend, zero-count
/// placeholders).
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("pollboard.toml");

    let config = if path.exists() {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?
    } else {
        info!("no config file at {}, using defaults", path.display());
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

/// Load configuration relative to the current working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::ReadError {
        path: PathBuf::from("."),
        source: e,
    })?;
    load_config_from(&cwd)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = config.backend.base_url.trim();
    if url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "backend.base_url".into(),
            message: "must not be empty".into(),
        });
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::ValidationError {
            field: "backend.base_url".into(),
            message: format!("`{url}` must start with http:// or https://"),
        });
    }
    if config.backend.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "backend.timeout_secs".into(),
            message: "must be at least 1".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
        assert_eq!(config.backend.base_url, "http://localhost:8080");
        assert_eq!(config.placeholder_mode(), PlaceholderMode::Zero);
    }

    #[test]
    fn full_file_parses() {
        let text = r#"
            [backend]
            base_url = "https://polls.example.com/api"
            timeout_secs = 5

            [demo]
            randomized_placeholder_results = true
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.backend.base_url, "https://polls.example.com/api");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.placeholder_mode(), PlaceholderMode::DemoRandom);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let text = r#"
            [backend]
            base_url = "http://10.0.0.5:9000"
        "#;
        let config: Config = toml::from_str(text).unwrap();
        assert_eq!(config.backend.timeout_secs, 10);
        assert!(!config.demo.randomized_placeholder_results);
    }

    #[test]
    fn empty_base_url_rejected() {
        let mut config = Config::default();
        config.backend.base_url = "  ".into();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn non_http_base_url_rejected() {
        let mut config = Config::default();
        config.backend.base_url = "ftp://example.com".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = Config::default();
        config.backend.timeout_secs = 0;
        assert!(validate(&config).is_err());
    }
}
