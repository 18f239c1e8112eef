//! Configuration for geofilter.
//!
//! Settings are read from an INI file at `~/.geofilter/config.ini`. A missing
//! file yields defaults; keys that are present overlay them.
//!
//! - [`settings`]: one struct per `[section]`
//! - [`defaults`]: `DEFAULT_*` constants and `Default` impls
//! - `parser` / `writer`: INI to settings and back
//! - [`file`]: load and save

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, HttpSettings, LoggingSettings, QuerySettings};
