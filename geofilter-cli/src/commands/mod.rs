//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`query`] - The describe, range, unique and filter commands
//! - [`rules`] - `--rule` argument parsing
//! - [`source`] - Layer source arguments shared by every command

pub mod query;
pub mod rules;
pub mod source;
