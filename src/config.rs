//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/gpx-enrich.toml

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::warn;

use crate::elevation::DEFAULT_ENDPOINT;
use crate::options::PipelineOptions;

pub const DEFAULT_CONFIG_PATH: &str = "config/gpx-enrich.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory receiving the modified GPX and viewer page
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElevationConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub elevation: ElevationConfig,
    #[serde(default)]
    pub pipeline: PipelineOptions,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    upload_dir: PathBuf,
    elevation_endpoint: String,
    elevation_timeout_ms: u64,
    pipeline: PipelineOptions,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default(), "default".to_string())
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: String) -> Self {
        Self {
            upload_dir: toml_config.storage.upload_dir,
            elevation_endpoint: toml_config.elevation.endpoint,
            elevation_timeout_ms: toml_config.elevation.timeout_ms,
            pipeline: toml_config.pipeline,
            config_file,
        }
    }

    /// Determine config file path from the `--config` value or environment
    pub fn resolve_config_path(arg: Option<&str>) -> String {
        if let Some(path) = arg {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        DEFAULT_CONFIG_PATH.to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&content, path.display().to_string())
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str, config_file: String) -> anyhow::Result<Self> {
        let toml_config: TomlConfig = toml::from_str(content)?;
        Ok(Self::from_toml(toml_config, config_file))
    }

    /// Load configuration - a missing file falls back to defaults, a
    /// malformed one is an error.
    pub fn load_from_path(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            warn!(config_file = %path, "config_file_missing_using_defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn elevation_endpoint(&self) -> &str {
        &self.elevation_endpoint
    }

    pub fn elevation_timeout(&self) -> Duration {
        Duration::from_millis(self.elevation_timeout_ms)
    }

    pub fn pipeline(&self) -> &PipelineOptions {
        &self.pipeline
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    pub fn set_upload_dir(&mut self, dir: impl Into<PathBuf>) {
        self.upload_dir = dir.into();
    }

    /// Switch elevation lookup off (offline runs).
    pub fn disable_elevation(&mut self) {
        self.pipeline.resolve_elevation = false;
    }
}
