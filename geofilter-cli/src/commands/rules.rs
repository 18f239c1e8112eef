//! Parsing of `--rule` arguments.
//!
//! A rule is `<attr><op><value>` where `<op>` is one of `=`, `!=`, `>`, `>=`,
//! `<` or `<=`. With `=`, `min..max` selects an inclusive range and `a,b,c`
//! matches any of the listed values.

use crate::error::CliError;
use geofilter::rule::{FilterRule, Operator};
use serde_json::{Number, Value};

const OPERATOR_CHARS: [char; 4] = ['!', '=', '<', '>'];

/// Parses one rule argument.
pub fn parse_rule(raw: &str) -> Result<FilterRule, CliError> {
    let invalid = |reason: &str| CliError::InvalidRule {
        rule: raw.to_string(),
        reason: reason.to_string(),
    };

    let pos = raw
        .find(OPERATOR_CHARS)
        .ok_or_else(|| invalid("missing operator"))?;
    let attr_name = raw[..pos].trim();
    if attr_name.is_empty() {
        return Err(invalid("missing attribute name"));
    }

    let rest = &raw[pos..];
    let (operator, value) = if let Some(v) = rest.strip_prefix("!=") {
        (Some(Operator::Ne), v)
    } else if let Some(v) = rest.strip_prefix(">=") {
        (Some(Operator::Ge), v)
    } else if let Some(v) = rest.strip_prefix("<=") {
        (Some(Operator::Le), v)
    } else if let Some(v) = rest.strip_prefix('=') {
        (None, v)
    } else if let Some(v) = rest.strip_prefix('>') {
        (Some(Operator::Gt), v)
    } else if let Some(v) = rest.strip_prefix('<') {
        (Some(Operator::Lt), v)
    } else {
        return Err(invalid("unknown operator"));
    };

    let value = value.trim();
    if value.is_empty() {
        return Err(invalid("missing value"));
    }

    let rule = match operator {
        None => {
            if let Some((min, max)) = value.split_once("..") {
                if min.trim().is_empty() || max.trim().is_empty() {
                    return Err(invalid("range needs both bounds"));
                }
                FilterRule::between(attr_name, parse_value(min), parse_value(max))
            } else if value.contains(',') {
                FilterRule::any_of(attr_name, value.split(',').map(parse_value))
            } else {
                FilterRule::equals(attr_name, parse_value(value))
            }
        }
        Some(op) => FilterRule::equals(attr_name, parse_value(value)).with_operator(op),
    };
    Ok(rule)
}

/// Interprets a literal as a number, a boolean or a string.
pub fn parse_value(raw: &str) -> Value {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
