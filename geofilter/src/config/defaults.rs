//! Default values for all configuration settings.

use super::file::config_directory;
use super::settings::*;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_MAX_FEATURES: u32 = 10_000;

pub const DEFAULT_EVALUATION_CHUNK_SIZE: usize = 1_000;

pub const DEFAULT_SRS: &str = "EPSG:25832";

pub const DEFAULT_LOG_FILE: &str = "geofilter.log";

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// User agent sent with every request, e.g. `geofilter/0.3.0`.
pub fn default_user_agent() -> String {
    format!("geofilter/{}", env!("CARGO_PKG_VERSION"))
}

/// Default log directory (`~/.geofilter/logs`).
pub fn default_log_directory() -> std::path::PathBuf {
    config_directory().join("logs")
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: default_user_agent(),
        }
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            evaluation_chunk_size: DEFAULT_EVALUATION_CHUNK_SIZE,
            default_srs: DEFAULT_SRS.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file: DEFAULT_LOG_FILE.to_string(),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            query: QuerySettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}
