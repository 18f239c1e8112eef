//! Rule → predicate translation and in-memory evaluation.

use super::types::{Combinator, FilterQuery, FilterRule, Operator, RuleValue};
use crate::feature::value::{as_text, loose_cmp, loose_eq, split_segments};
use crate::feature::Feature;
use serde_json::Value;
use std::cmp::Ordering;

/// Scalar comparison applied to one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
}

impl CompareOp {
    fn from_operator(operator: Option<Operator>) -> Self {
        match operator {
            None | Some(Operator::Eq) | Some(Operator::Between) => Self::Eq,
            Some(Operator::Ne) => Self::Ne,
            Some(Operator::Gt) => Self::Gt,
            Some(Operator::Ge) => Self::Ge,
            Some(Operator::Lt) => Self::Lt,
            Some(Operator::Le) => Self::Le,
            Some(Operator::In) => Self::Contains,
            Some(Operator::StartsWith) => Self::StartsWith,
            Some(Operator::EndsWith) => Self::EndsWith,
        }
    }

    fn test(&self, candidate: &Value, expected: &Value) -> bool {
        match self {
            Self::Eq => loose_eq(candidate, expected),
            Self::Ne => !loose_eq(candidate, expected),
            Self::Gt => loose_cmp(candidate, expected) == Some(Ordering::Greater),
            Self::Ge => matches!(
                loose_cmp(candidate, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt => loose_cmp(candidate, expected) == Some(Ordering::Less),
            Self::Le => matches!(
                loose_cmp(candidate, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Contains => lower(candidate).contains(&lower(expected)),
            Self::StartsWith => lower(candidate).starts_with(&lower(expected)),
            Self::EndsWith => lower(candidate).ends_with(&lower(expected)),
        }
    }
}

fn lower(value: &Value) -> String {
    as_text(value).to_lowercase()
}

/// A translated filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        attribute: String,
        op: CompareOp,
        value: Value,
        delimiter: Option<String>,
    },
    /// Inclusive on both ends.
    Between {
        attribute: String,
        min: Value,
        max: Value,
        delimiter: Option<String>,
    },
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
}

impl Predicate {
    /// Translates one rule.
    ///
    /// Returns `None` for a rule that imposes no constraint (an empty value list).
    pub fn from_rule(rule: &FilterRule) -> Option<Self> {
        let attribute = rule.attr_name.clone();
        let delimiter = rule.delimiter.clone().filter(|d| !d.is_empty());

        match &rule.value {
            RuleValue::Range { min, max } => Some(Self::Between {
                attribute,
                min: min.clone(),
                max: max.clone(),
                delimiter,
            }),
            RuleValue::List(items)
                if rule.operator == Some(Operator::Between) && items.len() == 2 =>
            {
                Some(Self::Between {
                    attribute,
                    min: items[0].clone(),
                    max: items[1].clone(),
                    delimiter,
                })
            }
            RuleValue::List(items) => {
                let op = CompareOp::from_operator(rule.operator);
                let mut comparisons: Vec<Predicate> = items
                    .iter()
                    .map(|value| Self::Compare {
                        attribute: attribute.clone(),
                        op,
                        value: value.clone(),
                        delimiter: delimiter.clone(),
                    })
                    .collect();
                match comparisons.len() {
                    0 => None,
                    1 => comparisons.pop(),
                    _ => Some(Self::Or(comparisons)),
                }
            }
            RuleValue::Scalar(value) => Some(Self::Compare {
                attribute,
                op: CompareOp::from_operator(rule.operator),
                value: value.clone(),
                delimiter,
            }),
        }
    }

    /// Translates a whole query.
    ///
    /// Rules are grouped by attribute in order of first appearance; each group
    /// combines with the combinator of its first rule, groups are AND-ed.
    /// Returns `None` when the query does not constrain anything.
    pub fn from_query(query: &FilterQuery) -> Option<Self> {
        let mut groups: Vec<(&str, Combinator, Vec<Predicate>)> = Vec::new();

        for rule in &query.rules {
            let Some(predicate) = Self::from_rule(rule) else {
                continue;
            };
            match groups
                .iter_mut()
                .find(|(name, _, _)| *name == rule.attr_name)
            {
                Some((_, _, members)) => members.push(predicate),
                None => groups.push((rule.attr_name.as_str(), rule.combinator, vec![predicate])),
            }
        }

        let mut combined: Vec<Predicate> = groups
            .into_iter()
            .map(|(_, combinator, mut members)| {
                if members.len() == 1 {
                    members.remove(0)
                } else if combinator == Combinator::And {
                    Self::And(members)
                } else {
                    Self::Or(members)
                }
            })
            .collect();

        match combined.len() {
            0 => None,
            1 => combined.pop(),
            _ => Some(Self::And(combined)),
        }
    }

    /// True if any comparison splits stored values on a delimiter.
    pub fn uses_delimiter(&self) -> bool {
        match self {
            Self::Compare { delimiter, .. } | Self::Between { delimiter, .. } => {
                delimiter.is_some()
            }
            Self::Or(members) | Self::And(members) => members.iter().any(Self::uses_delimiter),
        }
    }

    /// Evaluates the predicate against a feature's attributes.
    ///
    /// A missing (or null) attribute never satisfies a comparison.
    pub fn matches(&self, feature: &Feature) -> bool {
        match self {
            Self::Compare {
                attribute,
                op,
                value,
                delimiter,
            } => {
                let Some(stored) = feature.attribute(attribute) else {
                    return false;
                };
                let candidates = candidates(stored, delimiter.as_deref());
                if *op == CompareOp::Ne {
                    // No segment may equal the value
                    !candidates.iter().any(|c| CompareOp::Eq.test(c, value))
                } else {
                    candidates.iter().any(|c| op.test(c, value))
                }
            }
            Self::Between {
                attribute,
                min,
                max,
                delimiter,
            } => {
                let Some(stored) = feature.attribute(attribute) else {
                    return false;
                };
                candidates(stored, delimiter.as_deref())
                    .iter()
                    .any(|c| CompareOp::Ge.test(c, min) && CompareOp::Le.test(c, max))
            }
            Self::Or(members) => members.iter().any(|p| p.matches(feature)),
            Self::And(members) => members.iter().all(|p| p.matches(feature)),
        }
    }
}

fn candidates(stored: &Value, delimiter: Option<&str>) -> Vec<Value> {
    match delimiter {
        Some(d) => split_segments(stored, d),
        None => vec![stored.clone()],
    }
}
