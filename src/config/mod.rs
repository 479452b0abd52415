//! Configuration loading, validation, and defaults

mod defaults;
mod loader;
mod validator;

pub use defaults::{default_config, ConfigDefaults};
pub use loader::{
    Config, ConfigError, ConfigLoader, LoggingSection, ScanSection, WatchSection,
};
pub use validator::{validate_config, ConfigValidator};

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
