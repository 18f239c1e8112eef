//! Placeholder for kinds that cannot be queried remotely.

use super::{
    AttributeDescription, FilterInterface, InterfaceFuture, RangeFlags, UniqueValueFlags,
    ValueRange,
};
use crate::error::FilterError;
use crate::feature::{Extent, Feature};
use crate::rule::FilterQuery;
use crate::service::{ServiceDescriptor, ServiceKind};
use serde_json::Value;
use std::sync::Arc;

/// External interface whose every method fails with
/// [`FilterError::UnsupportedOperation`].
pub struct UnsupportedInterface {
    kind: ServiceKind,
}

impl UnsupportedInterface {
    pub fn new(kind: ServiceKind) -> Self {
        Self { kind }
    }

    fn reject<T: Send + 'static>(&self) -> InterfaceFuture<T> {
        let error = FilterError::UnsupportedOperation {
            kind: self.kind,
            external: true,
        };
        Box::pin(async move { Err(error) })
    }
}

impl FilterInterface for UnsupportedInterface {
    fn kind(&self) -> ServiceKind {
        self.kind
    }

    fn is_external(&self) -> bool {
        true
    }

    fn describe_attributes(
        &self,
        _service: Arc<ServiceDescriptor>,
    ) -> InterfaceFuture<Vec<AttributeDescription>> {
        self.reject()
    }

    fn get_value_range(
        &self,
        _service: Arc<ServiceDescriptor>,
        _attr_name: String,
        _flags: RangeFlags,
        _extent: Option<Extent>,
    ) -> InterfaceFuture<ValueRange> {
        self.reject()
    }

    fn get_unique_values(
        &self,
        _service: Arc<ServiceDescriptor>,
        _attr_name: String,
        _flags: UniqueValueFlags,
        _extent: Option<Extent>,
    ) -> InterfaceFuture<Vec<Value>> {
        self.reject()
    }

    fn run_filter_query(
        &self,
        _service: Arc<ServiceDescriptor>,
        _query: FilterQuery,
        _extent: Option<Extent>,
    ) -> InterfaceFuture<Vec<Feature>> {
        self.reject()
    }
}
