//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use geofilter::config::ConfigFileError;
use geofilter::error::{FilterError, TransportError};
use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Source arguments are incomplete or contradictory
    Source(String),
    /// A `--rule` argument could not be parsed
    InvalidRule { rule: String, reason: String },
    /// Failed to read an input file
    FileRead { path: String, error: std::io::Error },
    /// The filter operation failed
    Filter(FilterError),
    /// Failed to render the result as JSON
    Output(serde_json::Error),
}

impl CliError {
    /// Exit code for this error: 2 for usage problems, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Source(_) | CliError::InvalidRule { .. } => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::InvalidRule { .. } => {
                eprintln!();
                eprintln!("Rules take one of these forms:");
                eprintln!("  attr=value            equal to value");
                eprintln!("  attr=v1,v2            equal to any of the values");
                eprintln!("  attr=min..max         between min and max (inclusive)");
                eprintln!("  attr!=value           not equal to value");
                eprintln!("  attr>value, attr<value, attr>=value, attr<=value");
            }
            CliError::Filter(FilterError::Transport(TransportError::Status { status, .. }))
                if *status == 400 =>
            {
                eprintln!();
                eprintln!("The service rejected the request. Check that:");
                eprintln!("  1. --feature-type names a type the service offers");
                eprintln!("  2. --namespace matches the type's namespace URI and prefix");
                eprintln!("  3. the filtered attributes exist on the feature type");
            }
            CliError::Filter(FilterError::UnsupportedOperation { .. }) => {
                eprintln!();
                eprintln!("Only WFS layers can be filtered by the remote service.");
                eprintln!("Load the features into a GeoJSON file and use --geojson instead.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Source(msg) => write!(f, "Invalid source: {}", msg),
            CliError::InvalidRule { rule, reason } => {
                write!(f, "Invalid rule '{}': {}", rule, reason)
            }
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path, error)
            }
            CliError::Filter(e) => write!(f, "{}", e),
            CliError::Output(e) => write!(f, "Failed to write output: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::FileRead { error, .. } => Some(error),
            CliError::Filter(e) => Some(e),
            CliError::Output(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FilterError> for CliError {
    fn from(e: FilterError) -> Self {
        CliError::Filter(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output(e)
    }
}
