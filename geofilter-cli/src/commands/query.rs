//! Query commands: describe, range, unique and filter.

use super::rules::parse_rule;
use super::source::SourceArgs;
use crate::error::CliError;
use crate::runner::CliRunner;
use clap::Args;
use geofilter::interface::{RangeFlags, UniqueValueFlags};
use geofilter::rule::{Combinator, FilterQuery, FilterRule};
use std::path::PathBuf;
use tracing::info;

/// Options every query command accepts.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Configuration file (default: ~/.geofilter/config.ini)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for the describe command.
#[derive(Args, Debug, Clone)]
pub struct DescribeArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the range command.
#[derive(Args, Debug, Clone)]
pub struct RangeArgs {
    /// Attribute to inspect
    pub attr: String,

    /// Only report the minimum
    #[arg(long, conflicts_with = "max_only")]
    pub min_only: bool,

    /// Only report the maximum
    #[arg(long)]
    pub max_only: bool,

    /// Only consider features inside --extent
    #[arg(long)]
    pub visible: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the unique command.
#[derive(Args, Debug, Clone)]
pub struct UniqueArgs {
    /// Attribute to inspect
    pub attr: String,

    /// Split multi-valued attributes on this separator
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Only consider features inside --extent
    #[arg(long)]
    pub visible: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Arguments for the filter command.
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// Rule such as district=A,B or area>=100 (repeatable)
    #[arg(long = "rule", value_name = "RULE")]
    pub rules: Vec<String>,

    /// Separator for multi-valued attributes, applied to every rule
    #[arg(long)]
    pub delimiter: Option<String>,

    /// AND rules on the same attribute instead of OR-ing them
    #[arg(long)]
    pub match_all: bool,

    /// Only return features inside --extent
    #[arg(long)]
    pub in_extent: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Lists the attributes of a layer.
pub async fn run_describe(args: DescribeArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.common.config.as_deref())?;
    runner.log_startup("describe");

    let dispatcher = runner.bind(&args.common.source)?;
    let attributes = dispatcher.describe_attributes().await?;
    info!(count = attributes.len(), "Described attributes");
    runner.print_json(&attributes)
}

/// Prints the value range of an attribute.
pub async fn run_range(args: RangeArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.common.config.as_deref())?;
    runner.log_startup("range");

    let dispatcher = runner.bind(&args.common.source)?;
    let flags = RangeFlags {
        min_only: args.min_only,
        max_only: args.max_only,
        only_visible: args.visible,
    };
    let range = dispatcher.get_value_range(&args.attr, flags).await?;
    runner.print_json(&range)
}

/// Prints the distinct values of an attribute.
pub async fn run_unique(args: UniqueArgs) -> Result<(), CliError> {
    let runner = CliRunner::new(args.common.config.as_deref())?;
    runner.log_startup("unique");

    let dispatcher = runner.bind(&args.common.source)?;
    let flags = UniqueValueFlags {
        only_visible: args.visible,
        delimiter: args.delimiter,
    };
    let values = dispatcher.get_unique_values(&args.attr, flags).await?;
    info!(attr = %args.attr, count = values.len(), "Collected unique values");
    runner.print_json(&values)
}

/// Prints the features matching a set of rules.
pub async fn run_filter(args: FilterArgs) -> Result<(), CliError> {
    let query = build_query(&args)?;

    let runner = CliRunner::new(args.common.config.as_deref())?;
    runner.log_startup("filter");

    let dispatcher = runner.bind(&args.common.source)?;
    let features = dispatcher.run_filter_query(query).await?;
    info!(count = features.len(), "Filter matched features");
    runner.print_json(&features)
}

/// Builds the query from `--rule`, `--delimiter`, `--match-all` and `--in-extent`.
pub fn build_query(args: &FilterArgs) -> Result<FilterQuery, CliError> {
    let combinator = if args.match_all {
        Combinator::And
    } else {
        Combinator::Or
    };

    let rules = args
        .rules
        .iter()
        .map(|raw| {
            let mut rule: FilterRule = parse_rule(raw)?.with_combinator(combinator);
            if let Some(delimiter) = &args.delimiter {
                rule = rule.with_delimiter(delimiter.as_str());
            }
            Ok(rule)
        })
        .collect::<Result<Vec<_>, CliError>>()?;

    let query = FilterQuery::new(rules);
    Ok(if args.in_extent {
        query.in_extent()
    } else {
        query
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_args(rules: &[&str]) -> FilterArgs {
        FilterArgs {
            rules: rules.iter().map(|r| r.to_string()).collect(),
            delimiter: None,
            match_all: false,
            in_extent: false,
            common: CommonArgs {
                source: SourceArgs::default(),
                config: None,
            },
        }
    }

    #[test]
    fn test_build_query_defaults() {
        let query = build_query(&filter_args(&["district=A", "area>5"])).unwrap();
        assert_eq!(query.rules.len(), 2);
        assert!(!query.search_in_extent);
        assert!(query.rules.iter().all(|r| r.combinator == Combinator::Or));
        assert!(query.rules.iter().all(|r| r.delimiter.is_none()));
    }

    #[test]
    fn test_build_query_options() {
        let mut args = filter_args(&["uses=library"]);
        args.delimiter = Some("|".to_string());
        args.match_all = true;
        args.in_extent = true;

        let query = build_query(&args).unwrap();
        assert!(query.search_in_extent);
        assert_eq!(query.rules[0].combinator, Combinator::And);
        assert_eq!(query.rules[0].delimiter.as_deref(), Some("|"));
    }

    #[test]
    fn test_build_query_rejects_bad_rule() {
        let err = build_query(&filter_args(&["district=A", "oops"])).unwrap_err();
        assert!(matches!(err, CliError::InvalidRule { .. }));
    }

    #[test]
    fn test_empty_rules_are_allowed() {
        let query = build_query(&filter_args(&[])).unwrap();
        assert!(query.rules.is_empty());
    }
}
