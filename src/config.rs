//! Configuration management for promql-smith
//!
//! This module provides configuration file support with TOML format,
//! environment variable overrides, and sensible defaults. The `[generator]`
//! table holds the generator [`Options`]; the `[run]` table holds settings
//! for a command-line generation run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::smith::Options;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Generator options
    #[serde(default)]
    pub generator: Options,

    /// Run settings
    #[serde(default)]
    pub run: RunConfig,
}

/// Which entry point a run calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// Instant query roots
    #[default]
    Instant,
    /// Range query roots
    Range,
    /// Unconstrained expressions of any type
    Expr,
    /// Bare selector matcher lists
    Selectors,
}

impl FromStr for QueryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "instant" => Ok(QueryKind::Instant),
            "range" => Ok(QueryKind::Range),
            "expr" => Ok(QueryKind::Expr),
            "selectors" => Ok(QueryKind::Selectors),
            other => Err(Error::Configuration(format!("unknown query kind '{}'", other))),
        }
    }
}

/// Run configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunConfig {
    /// Number of expressions to generate
    #[serde(default = "default_count")]
    pub count: usize,

    /// Random seed; a fresh one is drawn when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Entry point to call
    #[serde(default)]
    pub query_kind: QueryKind,

    /// JSON file with the series catalog; a built-in demo catalog is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_file: Option<PathBuf>,

    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_count() -> usize { 10 }
fn default_log_level() -> String { "warn".to_string() }

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            seed: None,
            query_kind: QueryKind::default(),
            series_file: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        // Run
        if let Ok(seed) = std::env::var("PROMQLSMITH_SEED") {
            if let Ok(s) = seed.parse() {
                self.run.seed = Some(s);
            }
        }
        if let Ok(count) = std::env::var("PROMQLSMITH_COUNT") {
            if let Ok(c) = count.parse() {
                self.run.count = c;
            }
        }
        if let Ok(series_file) = std::env::var("PROMQLSMITH_SERIES_FILE") {
            self.run.series_file = Some(PathBuf::from(series_file));
        }

        // Generator
        if let Ok(depth) = std::env::var("PROMQLSMITH_MAX_DEPTH") {
            if let Ok(d) = depth.parse() {
                self.generator.max_depth = d;
            }
        }

        // Logging
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            self.run.log_level = log_level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.generator.validate()?;

        if self.run.count == 0 {
            return Err(Error::Configuration("count must be > 0".to_string()));
        }

        if let Some(path) = &self.run.series_file {
            if path.as_os_str().is_empty() {
                return Err(Error::Configuration("series_file cannot be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::BinaryOp;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.run.count, 10);
        assert_eq!(config.run.query_kind, QueryKind::Instant);
        assert_eq!(config.generator.max_depth, 5);
        assert!(config.run.seed.is_none());
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_count() {
        let mut config = Config::default();
        config.run.count = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generator.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("smith.toml");
        std::fs::write(
            &path,
            r#"
[generator]
enable_offset = true
enabled_binops = ["add", "and"]

[run]
seed = 42
query_kind = "range"
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.generator.enable_offset);
        assert_eq!(config.generator.enabled_binops, vec![BinaryOp::Add, BinaryOp::And]);
        assert_eq!(config.generator.max_depth, 5);
        assert_eq!(config.run.seed, Some(42));
        assert_eq!(config.run.query_kind, QueryKind::Range);
        assert_eq!(config.run.count, 10);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("smith.toml");

        let mut config = Config::default();
        config.run.count = 3;
        config.run.query_kind = QueryKind::Selectors;
        config.generator.enable_vector_matching = true;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.run.count, 3);
        assert_eq!(loaded.run.query_kind, QueryKind::Selectors);
        assert!(loaded.generator.enable_vector_matching);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/smith.toml").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_query_kind_from_str() {
        assert_eq!("Range".parse::<QueryKind>().unwrap(), QueryKind::Range);
        assert_eq!("selectors".parse::<QueryKind>().unwrap(), QueryKind::Selectors);
        assert!("matrix".parse::<QueryKind>().is_err());
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("PROMQLSMITH_COUNT", "77");
        std::env::set_var("PROMQLSMITH_MAX_DEPTH", "not-a-number");
        let config = Config::from_env();
        assert_eq!(config.run.count, 77);
        assert_eq!(config.generator.max_depth, 5);
        std::env::remove_var("PROMQLSMITH_COUNT");
        std::env::remove_var("PROMQLSMITH_MAX_DEPTH");
    }
}
