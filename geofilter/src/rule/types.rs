//! Rule and query types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator requested by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Between,
    /// Case-insensitive substring match.
    In,
    StartsWith,
    EndsWith,
}

/// How rules on the same attribute combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    And,
    #[default]
    Or,
}

/// The value side of a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// Inclusive range.
    Range { min: Value, max: Value },
    /// Any of several values.
    List(Vec<Value>),
    /// A single value.
    Scalar(Value),
}

impl From<Value> for RuleValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::List(items),
            other => Self::Scalar(other),
        }
    }
}

/// A single predicate on one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    #[serde(alias = "attrName")]
    pub attr_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    pub value: RuleValue,
    /// Separator for attributes storing several values in one string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    #[serde(default, alias = "combineWithSiblings")]
    pub combinator: Combinator,
    /// Provenance only; not part of the rule's meaning.
    #[serde(default, skip_serializing)]
    pub fixed: bool,
    /// Provenance only; not part of the rule's meaning.
    #[serde(default, skip_serializing)]
    pub startup: bool,
}

impl FilterRule {
    /// Creates a rule with the default operator.
    pub fn new(attr_name: impl Into<String>, value: RuleValue) -> Self {
        Self {
            attr_name: attr_name.into(),
            operator: None,
            value,
            delimiter: None,
            combinator: Combinator::default(),
            fixed: false,
            startup: false,
        }
    }

    /// `attr == value`.
    pub fn equals(attr_name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attr_name, RuleValue::Scalar(value.into()))
    }

    /// `attr` equals any of `values`.
    pub fn any_of<V: Into<Value>>(
        attr_name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            attr_name,
            RuleValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// `min <= attr <= max`.
    pub fn between(
        attr_name: impl Into<String>,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        Self::new(
            attr_name,
            RuleValue::Range {
                min: min.into(),
                max: max.into(),
            },
        )
    }

    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn with_combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }
}

/// An ordered set of rules; distinct attributes are AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterQuery {
    #[serde(default)]
    pub rules: Vec<FilterRule>,
    /// Restrict results to the current map extent.
    #[serde(default, alias = "searchInMapExtent")]
    pub search_in_extent: bool,
}

impl FilterQuery {
    pub fn new(rules: Vec<FilterRule>) -> Self {
        Self {
            rules,
            search_in_extent: false,
        }
    }

    pub fn in_extent(mut self) -> Self {
        self.search_in_extent = true;
        self
    }
}
