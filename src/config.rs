//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracks: TracksConfig,

    #[serde(default)]
    pub index: IndexConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Track directory configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TracksConfig {
    #[serde(default = "default_tracks_dir")]
    pub dir: String,
}

fn default_tracks_dir() -> String {
    "./tracks".to_string()
}

impl Default for TracksConfig {
    fn default() -> Self {
        Self {
            dir: default_tracks_dir(),
        }
    }
}

/// CSV index configuration
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_path")]
    pub path: String,

    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,
}

fn default_index_path() -> String {
    "./data.csv".to_string()
}

fn default_geometry_column() -> String {
    "geometry".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: default_index_path(),
            geometry_column: default_geometry_column(),
        }
    }
}

/// Remote record store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_token_file")]
    pub token_file: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_token_file() -> String {
    "./.api_token".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_file: default_token_file(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("tracksync").join("config.toml")),
            Some(PathBuf::from("/etc/tracksync/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        // Fall back to environment-only config
        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        // Track directory overrides
        if let Ok(dir) = std::env::var("TRACKSYNC_TRACKS_DIR") {
            self.tracks.dir = dir;
        }

        // Index overrides
        if let Ok(path) = std::env::var("TRACKSYNC_INDEX_PATH") {
            self.index.path = path;
        }
        if let Ok(column) = std::env::var("TRACKSYNC_GEOMETRY_COLUMN") {
            self.index.geometry_column = column;
        }

        // Remote overrides
        if let Ok(url) = std::env::var("TRACKSYNC_BASE_URL") {
            self.remote.base_url = url;
        }
        if let Ok(token_file) = std::env::var("TRACKSYNC_TOKEN_FILE") {
            self.remote.token_file = token_file;
        }

        // Logging overrides
        if let Ok(level) = std::env::var("TRACKSYNC_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TRACKSYNC_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracks: TracksConfig::default(),
            index: IndexConfig::default(),
            remote: RemoteConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Tracksync Configuration
#
# Environment variables override these settings:
# - TRACKSYNC_TRACKS_DIR
# - TRACKSYNC_INDEX_PATH
# - TRACKSYNC_GEOMETRY_COLUMN
# - TRACKSYNC_BASE_URL
# - TRACKSYNC_TOKEN_FILE
# - TRACKSYNC_LOG_LEVEL
# - TRACKSYNC_LOG_FORMAT

[tracks]
# Directory containing YYYY-MM-DD.gpx track files
dir = "./tracks"

[index]
# CSV index file; first column is the date, second the record identifier
path = "./data.csv"

# Header name of the column that receives the WKT geometry
geometry_column = "geometry"

[remote]
# Record store API root
base_url = "http://localhost:8080"

# File holding the bearer token (single line)
token_file = "./.api_token"

# Request timeout in milliseconds
request_timeout_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tracks.dir, "./tracks");
        assert_eq!(config.index.path, "./data.csv");
        assert_eq!(config.index.geometry_column, "geometry");
        assert_eq!(config.remote.request_timeout_ms, 10_000);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [tracks]
            dir = "/srv/gpx"

            [remote]
            base_url = "https://records.example.com/api/v2"
            "#,
        )
        .unwrap();

        assert_eq!(config.tracks.dir, "/srv/gpx");
        assert_eq!(config.remote.base_url, "https://records.example.com/api/v2");
        // Untouched sections keep their defaults
        assert_eq!(config.index.geometry_column, "geometry");
        assert_eq!(config.remote.token_file, "./.api_token");
    }

    #[test]
    fn test_generated_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.index.path, "./data.csv");
    }
}
