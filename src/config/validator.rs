//! Validation of loaded configuration values

use super::loader::{parse_representation, Config, ConfigError, LoggingSection, ScanSection};
use crate::core::types::Width;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scan(&config.scan)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_scan(scan: &ScanSection) -> Result<(), ConfigError> {
        if Width::from_bits(scan.width_bits).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Element width must be 8, 16, 32 or 64 bits, got {}",
                scan.width_bits
            )));
        }

        if parse_representation(&scan.representation).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Representation must be signed, unsigned, hex or float, got {:?}",
                scan.representation
            )));
        }

        if scan.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "Poll interval must be at least 1ms".to_string(),
            ));
        }

        if scan.poll_interval_ms > 60_000 {
            return Err(ConfigError::Invalid(
                "Poll interval cannot exceed 60 seconds".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_logging(logging: &LoggingSection) -> Result<(), ConfigError> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Unknown log level: {:?}",
                logging.level
            )));
        }
        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
