//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Outgoing HTTP requests to external services
    pub http: HttpSettings,
    /// Query construction and local evaluation
    pub query: QuerySettings,
    /// Log file location and level
    pub logging: LoggingSettings,
}

/// `[http]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSettings {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// `[query]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    /// `maxFeatures` sent with WFS requests that carry no layer limit.
    pub max_features: u32,
    /// Features evaluated between yields to the runtime.
    pub evaluation_chunk_size: usize,
    /// Reference system used when no map view supplies one.
    pub default_srs: String,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}
