//! Configuration loading from TOML files, merged with defaults

use super::defaults::default_config;
use crate::core::types::{Representation, Width};
use crate::scan::ScanConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_scan")]
    pub scan: ScanSection,

    #[serde(default = "default_watch")]
    pub watch: WatchSection,

    #[serde(default = "default_logging")]
    pub logging: LoggingSection,
}

/// Element shape and polling cadence of the search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSection {
    #[serde(default = "default_width_bits")]
    pub width_bits: u32,
    #[serde(default = "default_representation")]
    pub representation: String,
    #[serde(default = "default_require_alignment")]
    pub require_alignment: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Watch list persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSection {
    #[serde(default = "default_watch_file")]
    pub file: String,
    #[serde(default = "default_autosave")]
    pub autosave: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_file")]
    pub file: String,
}

pub(super) fn parse_representation(name: &str) -> Option<Representation> {
    match name {
        "signed" => Some(Representation::Signed),
        "unsigned" => Some(Representation::Unsigned),
        "hex" => Some(Representation::Hex),
        "float" => Some(Representation::Float),
        _ => None,
    }
}

impl ScanSection {
    /// The element shape this section describes, assuming it validated
    pub fn to_scan_config(&self) -> Result<ScanConfig, ConfigError> {
        let width = Width::from_bits(self.width_bits).ok_or_else(|| {
            ConfigError::Invalid(format!("Unsupported element width: {}", self.width_bits))
        })?;
        let representation = parse_representation(&self.representation).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Unknown representation: {:?}",
                self.representation
            ))
        })?;
        Ok(ScanConfig {
            width,
            representation,
            require_alignment: self.require_alignment,
        })
    }
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration or returns defaults if file doesn't exist
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|_| Config::default())
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

// Default functions for serde
fn default_scan() -> ScanSection {
    let defaults = default_config();
    ScanSection {
        width_bits: defaults.scan.width_bits,
        representation: defaults.scan.representation,
        require_alignment: defaults.scan.require_alignment,
        poll_interval_ms: defaults.scan.poll_interval_ms,
    }
}

fn default_watch() -> WatchSection {
    let defaults = default_config();
    WatchSection {
        file: defaults.watch.file,
        autosave: defaults.watch.autosave,
    }
}

fn default_logging() -> LoggingSection {
    let defaults = default_config();
    LoggingSection {
        level: defaults.logging.level,
        file: defaults.logging.file,
    }
}

// Individual field defaults
fn default_width_bits() -> u32 {
    default_config().scan.width_bits
}

fn default_representation() -> String {
    default_config().scan.representation
}

fn default_require_alignment() -> bool {
    default_config().scan.require_alignment
}

fn default_poll_interval_ms() -> u64 {
    default_config().scan.poll_interval_ms
}

fn default_watch_file() -> String {
    default_config().watch.file
}

fn default_autosave() -> bool {
    default_config().watch.autosave
}

fn default_log_level() -> String {
    default_config().logging.level
}

fn default_log_file() -> String {
    default_config().logging.file
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scan: default_scan(),
            watch: default_watch(),
            logging: default_logging(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_converts() {
        let config = Config::default();
        let scan = config.scan.to_scan_config().unwrap();
        assert_eq!(scan.width, Width::W8);
        assert_eq!(scan.representation, Representation::Signed);
        assert!(scan.require_alignment);
    }

    #[test]
    fn test_parse_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [scan]
            width_bits = 32
            representation = "float"
            "#,
        )
        .unwrap();
        assert_eq!(config.scan.width_bits, 32);
        assert_eq!(config.scan.representation, "float");
        assert!(config.scan.require_alignment);
        assert_eq!(config.watch.file, "watches.wch");
    }

    #[test]
    fn test_bad_width_rejected_on_conversion() {
        let mut config = Config::default();
        config.scan.width_bits = 24;
        assert!(config.scan.to_scan_config().is_err());
        config.scan.width_bits = 64;
        config.scan.representation = "octal".to_string();
        assert!(config.scan.to_scan_config().is_err());
    }

    #[test]
    fn test_loader_missing_file() {
        let loader = ConfigLoader::new("/nonexistent/config.toml");
        assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
        let config = loader.load_or_default();
        assert_eq!(config.scan.width_bits, 8);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let loader = ConfigLoader::new(&path);

        let mut config = Config::default();
        config.scan.width_bits = 16;
        config.watch.autosave = true;
        loader.save(&config).unwrap();

        let back = loader.load().unwrap();
        assert_eq!(back.scan.width_bits, 16);
        assert!(back.watch.autosave);
    }
}
