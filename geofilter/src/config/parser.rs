//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
/// Empty values keep the default.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [http] section
    if let Some(section) = ini.section(Some("http")) {
        if let Some(v) = non_empty(section.get("timeout")) {
            config.http.timeout_secs =
                parse_positive("http", "timeout", v, "must be a positive integer (seconds)")?;
        }
        if let Some(v) = non_empty(section.get("user_agent")) {
            config.http.user_agent = v.to_string();
        }
    }

    // [query] section
    if let Some(section) = ini.section(Some("query")) {
        if let Some(v) = non_empty(section.get("max_features")) {
            config.query.max_features =
                parse_positive("query", "max_features", v, "must be a positive integer")?;
        }
        if let Some(v) = non_empty(section.get("evaluation_chunk_size")) {
            config.query.evaluation_chunk_size = parse_positive(
                "query",
                "evaluation_chunk_size",
                v,
                "must be a positive integer",
            )?;
        }
        if let Some(v) = non_empty(section.get("default_srs")) {
            if !v.contains(':') {
                return Err(invalid(
                    "query",
                    "default_srs",
                    v,
                    "expected an identifier like 'EPSG:25832'",
                ));
            }
            config.query.default_srs = v.to_string();
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = v.to_string();
        }
        if let Some(v) = non_empty(section.get("level")) {
            let level = v.to_lowercase();
            if tracing_subscriber::EnvFilter::try_new(&level).is_err() {
                return Err(invalid(
                    "logging",
                    "level",
                    v,
                    "must be one of: trace, debug, info, warn, error (or a RUST_LOG directive)",
                ));
            }
            config.logging.level = level;
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive<T>(section: &str, key: &str, value: &str, reason: &str) -> Result<T, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(invalid(section, key, value, reason)),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expands a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;

    fn parse(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let ini = Ini::load_from_str(content).unwrap();
        parse_ini(&ini)
    }

    #[test]
    fn test_empty_ini_yields_defaults() {
        assert_eq!(parse("").unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_overlay_values() {
        let config = parse(
            "[http]\ntimeout = 5\nuser_agent = portal/1.0\n\
             [query]\nmax_features = 250\nevaluation_chunk_size = 64\ndefault_srs = EPSG:4326\n\
             [logging]\ndirectory = /tmp/geofilter\nfile = run.log\nlevel = DEBUG\n",
        )
        .unwrap();

        assert_eq!(config.http.timeout_secs, 5);
        assert_eq!(config.http.user_agent, "portal/1.0");
        assert_eq!(config.query.max_features, 250);
        assert_eq!(config.query.evaluation_chunk_size, 64);
        assert_eq!(config.query.default_srs, "EPSG:4326");
        assert_eq!(config.logging.directory, PathBuf::from("/tmp/geofilter"));
        assert_eq!(config.logging.file, "run.log");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_blank_value_keeps_default() {
        let config = parse("[http]\ntimeout =\n").unwrap();
        assert_eq!(config.http.timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn test_invalid_timeout() {
        let err = parse("[http]\ntimeout = soon\n").unwrap_err();
        match err {
            ConfigFileError::InvalidValue {
                section,
                key,
                value,
                ..
            } => {
                assert_eq!(section, "http");
                assert_eq!(key, "timeout");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            parse("[query]\nevaluation_chunk_size = 0\n"),
            Err(ConfigFileError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_srs_must_be_qualified() {
        assert!(parse("[query]\ndefault_srs = 25832\n").is_err());
    }

    #[test]
    fn test_invalid_level() {
        assert!(parse("[logging]\nlevel = [broken\n").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/logs"), home.join("logs"));
        }
    }
}
