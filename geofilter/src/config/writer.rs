//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[http]
; Request timeout in seconds for external feature services (default: 30)
timeout = {}
; User-Agent header sent with every request
user_agent = {}

[query]
; maxFeatures sent with WFS GetFeature requests when a layer sets no limit
max_features = {}
; Features evaluated locally before yielding to other tasks
evaluation_chunk_size = {}
; Reference system used when no map supplies one
default_srs = {}

[logging]
; Directory for the session log file (default: ~/.geofilter/logs)
directory = {}
file = {}
; trace, debug, info, warn, error; RUST_LOG takes precedence
level = {}
"#,
        config.http.timeout_secs,
        config.http.user_agent,
        config.query.max_features,
        config.query.evaluation_chunk_size,
        config.query.default_srs,
        path_to_string(&config.logging.directory),
        config.logging.file,
        config.logging.level,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
