//! Local evaluation over loaded features.
//!
//! Shared by the in-memory interfaces and by the WFS interface once a
//! response has been decoded. Long loops hand control back to the runtime
//! every `chunk_size` features.

use super::{AttributeDescription, AttributeType, RangeFlags, ValueRange};
use crate::feature::value::{display_cmp, sort_unique, split_segments};
use crate::feature::{Extent, Feature};
use crate::rule::Predicate;
use serde_json::Value;
use std::cmp::Ordering;

/// Chunked iteration over a feature slice restricted to an extent.
pub(super) struct Evaluation<'a> {
    features: &'a [Feature],
    extent: Option<Extent>,
    chunk_size: usize,
}

impl<'a> Evaluation<'a> {
    pub(super) fn new(features: &'a [Feature], extent: Option<Extent>, chunk_size: usize) -> Self {
        Self {
            features,
            extent,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Calls `visit` for every feature inside the extent.
    async fn for_each(&self, mut visit: impl FnMut(&'a Feature)) {
        for (index, feature) in self.features.iter().enumerate() {
            if index > 0 && index % self.chunk_size == 0 {
                tokio::task::yield_now().await;
            }
            if self.extent.map_or(true, |e| feature.is_within(&e)) {
                visit(feature);
            }
        }
    }

    /// Features matching `predicate` (all of them when `None`).
    pub(super) async fn select(&self, predicate: Option<&Predicate>) -> Vec<Feature> {
        let mut selected = Vec::new();
        self.for_each(|feature| {
            if predicate.map_or(true, |p| p.matches(feature)) {
                selected.push(feature.clone());
            }
        })
        .await;
        selected
    }

    /// Bounds of a scalar attribute; composite values are ignored.
    pub(super) async fn value_range(&self, attr_name: &str, flags: RangeFlags) -> ValueRange {
        let mut min: Option<&Value> = None;
        let mut max: Option<&Value> = None;

        self.for_each(|feature| {
            let Some(value) = feature.attribute(attr_name) else {
                return;
            };
            if value.is_array() || value.is_object() {
                return;
            }
            if min.map_or(true, |m| display_cmp(value, m) == Ordering::Less) {
                min = Some(value);
            }
            if max.map_or(true, |m| display_cmp(value, m) == Ordering::Greater) {
                max = Some(value);
            }
        })
        .await;

        ValueRange {
            min: min.filter(|_| !flags.max_only).cloned(),
            max: max.filter(|_| !flags.min_only).cloned(),
        }
    }

    /// Distinct values of an attribute, optionally split on a delimiter.
    pub(super) async fn unique_values(&self, attr_name: &str, delimiter: Option<&str>) -> Vec<Value> {
        let mut values = Vec::new();
        self.for_each(|feature| {
            let Some(value) = feature.attribute(attr_name) else {
                return;
            };
            match delimiter.filter(|d| !d.is_empty()) {
                Some(d) => values.extend(split_segments(value, d)),
                None => values.push(value.clone()),
            }
        })
        .await;
        sort_unique(&mut values);
        values
    }
}

/// Infers attribute names and types from feature properties.
///
/// Names keep the order of first appearance. A type conflict between integer
/// and number widens to number; any other conflict falls back to string.
pub(super) fn infer_attributes(features: &[Feature]) -> Vec<AttributeDescription> {
    let mut attributes: Vec<AttributeDescription> = Vec::new();

    for feature in features {
        for (name, value) in &feature.properties {
            let Some(observed) = value_type(value) else {
                continue;
            };
            match attributes.iter_mut().find(|a| &a.name == name) {
                Some(existing) => existing.data_type = widen(existing.data_type, observed),
                None => attributes.push(AttributeDescription::new(name.clone(), observed)),
            }
        }
    }

    attributes
}

fn value_type(value: &Value) -> Option<AttributeType> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some(AttributeType::Boolean),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(AttributeType::Integer),
        Value::Number(_) => Some(AttributeType::Number),
        Value::String(s) if looks_like_date(s) => Some(AttributeType::Date),
        Value::String(_) => Some(AttributeType::String),
        Value::Object(map) if map.contains_key("type") && map.contains_key("coordinates") => {
            Some(AttributeType::Geometry)
        }
        _ => Some(AttributeType::Unknown),
    }
}

/// `YYYY-MM-DD` with an optional time part.
fn looks_like_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
        && (bytes.len() == 10 || matches!(bytes[10], b'T' | b' '))
}

fn widen(current: AttributeType, observed: AttributeType) -> AttributeType {
    use AttributeType::*;
    match (current, observed) {
        (a, b) if a == b => a,
        (Integer, Number) | (Number, Integer) => Number,
        _ => String,
    }
}
