//! geofilter CLI - Command-line interface
//!
//! Asks filter questions of a GeoJSON file or a WFS endpoint and prints the
//! answers as JSON on stdout. Logs go to the configured log file and stderr.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};
use commands::query::{self, DescribeArgs, FilterArgs, RangeArgs, UniqueArgs};

#[derive(Parser)]
#[command(name = "geofilter")]
#[command(version, about = "Filter queries for geodata layers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the attributes of a layer and their types
    Describe(DescribeArgs),
    /// Show the smallest and largest value of an attribute
    Range(RangeArgs),
    /// List the distinct values of an attribute
    Unique(UniqueArgs),
    /// Print the features matching a set of rules
    Filter(FilterArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Describe(args) => query::run_describe(args).await,
        Commands::Range(args) => query::run_range(args).await,
        Commands::Unique(args) => query::run_unique(args).await,
        Commands::Filter(args) => query::run_filter(args).await,
    };

    if let Err(e) = result {
        e.exit();
    }
}
