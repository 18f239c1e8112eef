//! Query dispatch for one filter-bound layer.
//!
//! A [`QueryDispatcher`] holds the layer's current [`ServiceDescriptor`],
//! resolves the interface implementation for its (kind, externality) and
//! routes every operation through the shared [`QueryCoordinator`], so
//! identical questions from different layers or widgets are computed once.

mod operation;

pub use operation::Operation;

use crate::coordinator::{DedupKey, Dispatch, Outcome, QueryCoordinator};
use crate::error::FilterError;
use crate::feature::{Extent, Feature};
use crate::interface::{
    AttributeDescription, InterfaceRegistry, QueryOutput, RangeFlags, UniqueValueFlags,
    ValueRange,
};
use crate::layer::MapView;
use crate::rule::FilterQuery;
use crate::service::{LayerMetadata, ServiceDescriptor};
use operation::contract_violation;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything that identifies a query.
#[derive(Serialize)]
struct KeyParts<'a> {
    service: &'a ServiceDescriptor,
    operation: &'a Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    extent: Option<Extent>,
}

/// Per-layer query dispatch service.
pub struct QueryDispatcher {
    coordinator: Arc<QueryCoordinator>,
    registry: Arc<InterfaceRegistry>,
    map: Arc<dyn MapView>,
    service: RwLock<Option<Arc<ServiceDescriptor>>>,
}

impl QueryDispatcher {
    pub fn new(
        coordinator: Arc<QueryCoordinator>,
        registry: Arc<InterfaceRegistry>,
        map: Arc<dyn MapView>,
    ) -> Self {
        Self {
            coordinator,
            registry,
            map,
            service: RwLock::new(None),
        }
    }

    /// Binds the layer to a backend, replacing any previous binding.
    ///
    /// On failure the previous binding is cleared, so later operations fail
    /// with "no service configured" rather than hit a stale backend.
    pub fn bind_service(
        &self,
        layer_id: &str,
        metadata: &LayerMetadata,
        external: bool,
    ) -> Result<ServiceDescriptor, FilterError> {
        let srs_name = self.map.srs_name();
        match ServiceDescriptor::bind(layer_id, metadata, external, &srs_name) {
            Ok(descriptor) => {
                info!(
                    layer_id = layer_id,
                    kind = %descriptor.kind(),
                    external = external,
                    "Filter service bound"
                );
                *self.service.write() = Some(Arc::new(descriptor.clone()));
                Ok(descriptor)
            }
            Err(e) => {
                warn!(layer_id = layer_id, error = %e, "Failed to bind filter service");
                *self.service.write() = None;
                Err(e)
            }
        }
    }

    /// Callback form of [`bind_service`](Self::bind_service); exactly one of
    /// the callbacks runs.
    pub fn bind_service_with(
        &self,
        layer_id: &str,
        metadata: &LayerMetadata,
        external: bool,
        on_success: impl FnOnce(ServiceDescriptor),
        on_error: impl FnOnce(FilterError),
    ) {
        match self.bind_service(layer_id, metadata, external) {
            Ok(descriptor) => on_success(descriptor),
            Err(e) => on_error(e),
        }
    }

    /// The currently bound descriptor.
    pub fn service(&self) -> Option<Arc<ServiceDescriptor>> {
        self.service.read().clone()
    }

    /// Drops the current binding.
    pub fn unbind(&self) {
        *self.service.write() = None;
    }

    /// Runs `operation`, delivering the result to exactly one callback.
    ///
    /// Without a bound service `on_error` runs immediately with "no service
    /// configured" and nothing else happens; the return value is then `None`.
    pub fn dispatch(
        &self,
        operation: Operation,
        on_success: impl FnOnce(Arc<QueryOutput>) + Send + 'static,
        on_error: impl FnOnce(FilterError) + Send + 'static,
    ) -> Option<Dispatch> {
        let prepared = match self.prepare(operation) {
            Ok(prepared) => prepared,
            Err(e) => {
                on_error(e);
                return None;
            }
        };

        let registry = Arc::clone(&self.registry);
        let Prepared {
            key,
            service,
            operation,
            extent,
        } = prepared;

        Some(self.coordinator.execute_deduplicated(
            key,
            move || run_on_registry(&registry, operation, service, extent),
            move |outcome: Outcome| match outcome {
                Ok(output) => on_success(output),
                Err(e) => on_error(e),
            },
        ))
    }

    /// Async form of [`dispatch`](Self::dispatch).
    pub async fn execute(&self, operation: Operation) -> Outcome {
        let Prepared {
            key,
            service,
            operation,
            extent,
        } = self.prepare(operation)?;

        let registry = Arc::clone(&self.registry);
        self.coordinator
            .execute(key, move || {
                run_on_registry(&registry, operation, service, extent)
            })
            .await
    }

    /// Lists the layer's attributes.
    pub async fn describe_attributes(&self) -> Result<Vec<AttributeDescription>, FilterError> {
        match &*self.execute(Operation::DescribeAttributes).await? {
            QueryOutput::Attributes(attributes) => Ok(attributes.clone()),
            other => Err(contract_violation("attributes", other)),
        }
    }

    /// Smallest and largest value of an attribute.
    pub async fn get_value_range(
        &self,
        attr_name: &str,
        flags: RangeFlags,
    ) -> Result<ValueRange, FilterError> {
        let operation = Operation::ValueRange {
            attr_name: attr_name.to_string(),
            flags,
        };
        match &*self.execute(operation).await? {
            QueryOutput::ValueRange(range) => Ok(range.clone()),
            other => Err(contract_violation("value range", other)),
        }
    }

    /// Distinct values of an attribute.
    pub async fn get_unique_values(
        &self,
        attr_name: &str,
        flags: UniqueValueFlags,
    ) -> Result<Vec<Value>, FilterError> {
        let operation = Operation::UniqueValues {
            attr_name: attr_name.to_string(),
            flags,
        };
        match &*self.execute(operation).await? {
            QueryOutput::UniqueValues(values) => Ok(values.clone()),
            other => Err(contract_violation("unique values", other)),
        }
    }

    /// Features matching the query.
    pub async fn run_filter_query(&self, query: FilterQuery) -> Result<Vec<Feature>, FilterError> {
        match &*self.execute(Operation::Filter { query }).await? {
            QueryOutput::Features(features) => Ok(features.clone()),
            other => Err(contract_violation("features", other)),
        }
    }

    fn prepare(&self, operation: Operation) -> Result<Prepared, FilterError> {
        let service = self.service().ok_or_else(FilterError::no_service)?;

        // Without a laid-out map the query is not restricted
        let extent = if operation.uses_extent() {
            self.map.extent()
        } else {
            None
        };

        let key = DedupKey::new(&KeyParts {
            service: &service,
            operation: &operation,
            extent,
        })?;

        debug!(
            layer_id = service.layer_id(),
            operation = operation.name(),
            key = %key,
            "Dispatching filter operation"
        );

        Ok(Prepared {
            key,
            service,
            operation,
            extent,
        })
    }
}

struct Prepared {
    key: DedupKey,
    service: Arc<ServiceDescriptor>,
    operation: Operation,
    extent: Option<Extent>,
}

fn run_on_registry(
    registry: &InterfaceRegistry,
    operation: Operation,
    service: Arc<ServiceDescriptor>,
    extent: Option<Extent>,
) -> crate::interface::InterfaceFuture<QueryOutput> {
    let (kind, external) = (service.kind(), service.is_external());
    match registry.get(kind, external) {
        Some(interface) => operation.run(interface.as_ref(), service, extent),
        None => {
            let error = FilterError::ConnectorContract(format!(
                "no {} interface registered for {}",
                if external { "external" } else { "internal" },
                kind
            ));
            Box::pin(async move { Err(error) })
        }
    }
}
