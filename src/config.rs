//! Configuration system for feedfold.
//!
//! Provides layered configuration from multiple sources:
//!
//! 1. **Compiled defaults** - Timings that match a typical feed page
//! 2. **User config file** - `~/.config/feedfold/config.toml`
//! 3. **Environment variables** - `FEEDFOLD_*` prefix
//! 4. **CLI arguments** - Highest priority, always wins
//!
//! # Example Configuration File
//!
//! ```toml
//! [paths]
//! store = "~/.local/share/feedfold/feedfold.db"
//! output_dir = "~/.local/share/feedfold/out"
//! tags = "~/.local/share/feedfold/folders.json"
//!
//! [extractor]
//! settle_delay_ms = 2500
//! final_settle_ms = 2000
//! stability_rounds = 5
//! max_rounds = 500
//!
//! [http]
//! timeout_secs = 30
//!
//! [output]
//! format = "text"
//! colors = true
//! ```

use crate::error::{FeedError, Result, VALID_CONFIG_KEYS, format_unknown_value_error};
use crate::extractor::{
    DEFAULT_FINAL_SETTLE_MS, DEFAULT_MAX_ROUNDS, DEFAULT_SETTLE_DELAY_MS, DEFAULT_STABILITY_ROUNDS,
};
use crate::surface::HttpOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main configuration structure for feedfold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the collection, artifacts, and folders live.
    pub paths: PathsConfig,
    /// Scroll loop timing and termination.
    pub extractor: ExtractorConfig,
    /// Settings for HTTP feed sources.
    pub http: HttpConfig,
    /// Output formatting configuration.
    pub output: OutputConfig,
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// `SQLite` collection store.
    /// Environment variable: `FEEDFOLD_STORE`
    pub store: Option<PathBuf>,

    /// Directory receiving the gallery and backup.
    /// Environment variable: `FEEDFOLD_OUTPUT`
    pub output_dir: Option<PathBuf>,

    /// Folder tag file.
    /// Environment variable: `FEEDFOLD_TAGS`
    pub tags: Option<PathBuf>,
}

/// Extraction loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Wait after each scroll before measuring.
    /// Environment variable: `FEEDFOLD_SETTLE_MS`
    pub settle_delay_ms: u64,

    /// Wait before the final scan pass.
    /// Environment variable: `FEEDFOLD_FINAL_SETTLE_MS`
    pub final_settle_ms: u64,

    /// Unchanged rounds treated as end of content.
    pub stability_rounds: u32,

    /// Hard ceiling on scroll rounds (0 = unbounded).
    /// Environment variable: `FEEDFOLD_MAX_ROUNDS`
    pub max_rounds: usize,
}

/// HTTP feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Output formatting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format: text, json, json-pretty.
    pub format: String,

    /// Enable colored output.
    pub colors: bool,

    /// Suppress non-essential output (spinners, hints).
    pub quiet: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            final_settle_ms: DEFAULT_FINAL_SETTLE_MS,
            stability_rounds: DEFAULT_STABILITY_ROUNDS,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("feedfold/{}", crate::VERSION),
            timeout_secs: 30,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            colors: true,
            quiet: false,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. User config file (~/.config/feedfold/config.toml)
    /// 3. Compiled defaults
    #[must_use]
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(user_config) = Self::load_user_config() {
            config.merge(user_config);
        }

        config.apply_env_overrides();

        debug!("Configuration loaded: {:?}", config);
        config
    }

    /// Load configuration from a specific file.
    #[must_use]
    pub fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            debug!("Config file not found: {}", path.display());
            return None;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded config from: {}", path.display());
                    Some(config)
                }
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                }
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn load_user_config() -> Option<Self> {
        let config_path = Self::user_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Get the path to the user configuration file.
    #[must_use]
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("feedfold").join("config.toml"))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(store) = std::env::var("FEEDFOLD_STORE") {
            self.paths.store = Some(PathBuf::from(store));
        }
        if let Ok(output) = std::env::var("FEEDFOLD_OUTPUT") {
            self.paths.output_dir = Some(PathBuf::from(output));
        }
        if let Ok(tags) = std::env::var("FEEDFOLD_TAGS") {
            self.paths.tags = Some(PathBuf::from(tags));
        }

        if let Some(n) = env_number("FEEDFOLD_MAX_ROUNDS") {
            self.extractor.max_rounds = n;
        }
        if let Some(n) = env_number("FEEDFOLD_SETTLE_MS") {
            self.extractor.settle_delay_ms = n;
        }
        if let Some(n) = env_number("FEEDFOLD_FINAL_SETTLE_MS") {
            self.extractor.final_settle_ms = n;
        }

        if let Ok(format) = std::env::var("FEEDFOLD_FORMAT") {
            self.output.format = format;
        }
        if std::env::var("FEEDFOLD_NO_COLOR").is_ok() || std::env::var("NO_COLOR").is_ok() {
            self.output.colors = false;
        }
        if std::env::var("FEEDFOLD_QUIET").is_ok() {
            self.output.quiet = true;
        }
    }

    /// Merge another config into this one (other takes precedence).
    fn merge(&mut self, other: Self) {
        if other.paths.store.is_some() {
            self.paths.store = other.paths.store;
        }
        if other.paths.output_dir.is_some() {
            self.paths.output_dir = other.paths.output_dir;
        }
        if other.paths.tags.is_some() {
            self.paths.tags = other.paths.tags;
        }

        self.extractor = other.extractor;
        self.http = other.http;

        self.output.format = other.output.format;
        self.output.colors = other.output.colors;
        self.output.quiet = other.output.quiet;
    }

    /// Collection store path, using defaults if not configured.
    #[must_use]
    pub fn store_path(&self) -> PathBuf {
        self.paths
            .store
            .clone()
            .unwrap_or_else(crate::default_store_path)
    }

    /// Artifact directory, using defaults if not configured.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.paths
            .output_dir
            .clone()
            .unwrap_or_else(crate::default_output_dir)
    }

    /// Folder tag file, using defaults if not configured.
    #[must_use]
    pub fn tags_path(&self) -> PathBuf {
        self.paths
            .tags
            .clone()
            .unwrap_or_else(crate::default_tags_path)
    }

    #[must_use]
    pub fn http_options(&self) -> HttpOptions {
        HttpOptions {
            user_agent: self.http.user_agent.clone(),
            timeout: Duration::from_secs(self.http.timeout_secs),
        }
    }

    /// Set one dotted key, e.g. `extractor.max_rounds`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidArgument`] for an unknown key or a value
    /// of the wrong type.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.parse().map_err(|_| {
                FeedError::invalid_argument(format!("'{value}' is not a valid value for {key}"))
            })
        }

        match key {
            "paths.store" => self.paths.store = Some(PathBuf::from(value)),
            "paths.output_dir" => self.paths.output_dir = Some(PathBuf::from(value)),
            "paths.tags" => self.paths.tags = Some(PathBuf::from(value)),
            "extractor.settle_delay_ms" => self.extractor.settle_delay_ms = parse(key, value)?,
            "extractor.final_settle_ms" => self.extractor.final_settle_ms = parse(key, value)?,
            "extractor.stability_rounds" => self.extractor.stability_rounds = parse(key, value)?,
            "extractor.max_rounds" => self.extractor.max_rounds = parse(key, value)?,
            "http.user_agent" => self.http.user_agent = value.to_string(),
            "http.timeout_secs" => self.http.timeout_secs = parse(key, value)?,
            "output.format" => self.output.format = value.to_string(),
            "output.colors" => self.output.colors = parse(key, value)?,
            "output.quiet" => self.output.quiet = parse(key, value)?,
            _ => {
                return Err(FeedError::invalid_argument(format_unknown_value_error(
                    "config key",
                    key,
                    VALID_CONFIG_KEYS,
                )));
            }
        }
        Ok(())
    }

    /// Save the current configuration to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FeedError::path_error("create directory", parent, e))?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| FeedError::ConfigError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        std::fs::write(path, content).map_err(|e| FeedError::path_error("write", path, e))?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Save the current configuration to the user config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined or the
    /// file cannot be written.
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::user_config_path()
            .ok_or_else(|| FeedError::invalid_argument("could not determine config directory"))?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Generate a default configuration file content.
    #[must_use]
    pub fn default_config_content() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn env_number<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ExtractPolicy;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.extractor.settle_delay_ms, 2500);
        assert_eq!(config.extractor.final_settle_ms, 2000);
        assert_eq!(config.extractor.stability_rounds, 5);
        assert_eq!(config.extractor.max_rounds, 500);
        assert!(config.output.colors);
        assert!(config.http.user_agent.starts_with("feedfold/"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.extractor, parsed.extractor);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: Config = toml::from_str("[extractor]\nmax_rounds = 40\n").unwrap();
        assert_eq!(parsed.extractor.max_rounds, 40);
        assert_eq!(parsed.extractor.settle_delay_ms, 2500);
        assert_eq!(parsed.http.timeout_secs, 30);
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.extractor.stability_rounds = 8;
        other.paths.store = Some(PathBuf::from("/custom/feed.db"));

        base.merge(other);

        assert_eq!(base.extractor.stability_rounds, 8);
        assert_eq!(base.paths.store, Some(PathBuf::from("/custom/feed.db")));
        assert!(base.paths.tags.is_none());
    }

    #[test]
    fn test_policy_from_config() {
        let mut config = ExtractorConfig::default();
        assert_eq!(ExtractPolicy::from(&config), ExtractPolicy::default());

        config.max_rounds = 0;
        assert_eq!(ExtractPolicy::from(&config).max_rounds, None);
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::default();
        config.set_value("extractor.max_rounds", "25").unwrap();
        config.set_value("paths.tags", "/tmp/f.json").unwrap();
        assert_eq!(config.extractor.max_rounds, 25);
        assert_eq!(config.paths.tags, Some(PathBuf::from("/tmp/f.json")));

        assert!(config.set_value("extractor.max_rounds", "many").is_err());
        let err = config.set_value("extractor.max_round", "1").unwrap_err();
        assert!(err.to_string().contains("extractor.max_rounds"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedfold").join("config.toml");
        let mut config = Config::default();
        config.extractor.final_settle_ms = 10;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.extractor.final_settle_ms, 10);
    }

    #[test]
    fn test_default_config_content() {
        let content = Config::default_config_content();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[extractor]"));
        assert!(content.contains("[http]"));
        assert!(content.contains("[output]"));
    }
}
