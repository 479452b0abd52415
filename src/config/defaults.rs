//! Default configuration values

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scan: ScanDefaults,
    pub watch: WatchDefaults,
    pub logging: LoggingDefaults,
}

/// Default scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanDefaults {
    pub width_bits: u32,
    pub representation: String,
    pub require_alignment: bool,
    pub poll_interval_ms: u64,
}

/// Default watch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchDefaults {
    pub file: String,
    pub autosave: bool,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
    pub file: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scan: ScanDefaults {
            width_bits: 8,
            representation: "signed".to_string(),
            require_alignment: true,
            poll_interval_ms: 16,
        },
        watch: WatchDefaults {
            file: "watches.wch".to_string(),
            autosave: false,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
            file: String::new(),
        },
    }
}
