//! The four questions a dispatcher can ask.

use crate::error::FilterError;
use crate::feature::Extent;
use crate::interface::{
    FilterInterface, InterfaceFuture, QueryOutput, RangeFlags, UniqueValueFlags,
};
use crate::rule::FilterQuery;
use crate::service::ServiceDescriptor;
use futures::FutureExt;
use serde::Serialize;
use std::sync::Arc;

/// One filter operation with its parameters.
///
/// The serialized form is part of the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    DescribeAttributes,
    ValueRange {
        attr_name: String,
        flags: RangeFlags,
    },
    UniqueValues {
        attr_name: String,
        flags: UniqueValueFlags,
    },
    Filter {
        query: FilterQuery,
    },
}

impl Operation {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DescribeAttributes => "describe_attributes",
            Self::ValueRange { .. } => "value_range",
            Self::UniqueValues { .. } => "unique_values",
            Self::Filter { .. } => "filter",
        }
    }

    /// True if the result depends on the visible map extent.
    pub fn uses_extent(&self) -> bool {
        match self {
            Self::DescribeAttributes => false,
            Self::ValueRange { flags, .. } => flags.only_visible,
            Self::UniqueValues { flags, .. } => flags.only_visible,
            Self::Filter { query } => query.search_in_extent,
        }
    }

    /// Runs the operation on `interface`, wrapping the result for caching.
    pub(super) fn run(
        self,
        interface: &dyn FilterInterface,
        service: Arc<ServiceDescriptor>,
        extent: Option<Extent>,
    ) -> InterfaceFuture<QueryOutput> {
        match self {
            Self::DescribeAttributes => interface
                .describe_attributes(service)
                .map(|r| r.map(QueryOutput::Attributes))
                .boxed(),
            Self::ValueRange { attr_name, flags } => interface
                .get_value_range(service, attr_name, flags, extent)
                .map(|r| r.map(QueryOutput::ValueRange))
                .boxed(),
            Self::UniqueValues { attr_name, flags } => interface
                .get_unique_values(service, attr_name, flags, extent)
                .map(|r| r.map(QueryOutput::UniqueValues))
                .boxed(),
            Self::Filter { query } => interface
                .run_filter_query(service, query, extent)
                .map(|r| r.map(QueryOutput::Features))
                .boxed(),
        }
    }
}

/// Error for an output of the wrong shape.
pub(super) fn contract_violation(expected: &str, actual: &QueryOutput) -> FilterError {
    FilterError::ConnectorContract(format!(
        "expected {} but the interface returned {}",
        expected,
        actual.variant_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::FilterRule;
    use serde_json::json;

    #[test]
    fn test_serialized_form() {
        let op = Operation::UniqueValues {
            attr_name: "district".to_string(),
            flags: UniqueValueFlags::default(),
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({
                "operation": "unique_values",
                "attr_name": "district",
                "flags": {"only_visible": false}
            })
        );
        assert_eq!(
            serde_json::to_value(Operation::DescribeAttributes).unwrap(),
            json!({"operation": "describe_attributes"})
        );
    }

    #[test]
    fn test_uses_extent() {
        assert!(!Operation::DescribeAttributes.uses_extent());
        let visible = RangeFlags {
            only_visible: true,
            ..Default::default()
        };
        assert!(Operation::ValueRange {
            attr_name: "area".to_string(),
            flags: visible,
        }
        .uses_extent());
        let query = FilterQuery::new(vec![FilterRule::equals("a", 1)]);
        assert!(!Operation::Filter {
            query: query.clone()
        }
        .uses_extent());
        assert!(Operation::Filter {
            query: query.in_extent()
        }
        .uses_extent());
    }
}
