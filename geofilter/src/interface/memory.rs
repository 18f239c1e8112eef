//! Internal interfaces: evaluation over features the layer already holds.

use super::evaluate::{infer_attributes, Evaluation};
use super::{
    AttributeDescription, FilterInterface, InterfaceFuture, RangeFlags, UniqueValueFlags,
    ValueRange,
};
use crate::feature::{Extent, Feature};
use crate::layer::LayerSource;
use crate::rule::{FilterQuery, Predicate};
use crate::service::{ServiceDescriptor, ServiceKind};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// In-memory interface for one service kind.
///
/// Reads the layer's features from a [`LayerSource`]. An unknown or not yet
/// loaded layer behaves like an empty one. For tiled vector layers, features
/// cut at tile borders appear once per tile and are reduced to their first
/// occurrence by id.
pub struct InMemoryInterface {
    kind: ServiceKind,
    layers: Arc<dyn LayerSource>,
    chunk_size: usize,
}

impl InMemoryInterface {
    pub fn new(kind: ServiceKind, layers: Arc<dyn LayerSource>, chunk_size: usize) -> Self {
        Self {
            kind,
            layers,
            chunk_size,
        }
    }

    fn snapshot(&self, layer_id: &str) -> Arc<Vec<Feature>> {
        let features = match self.layers.features(layer_id) {
            Some(features) => features,
            None => {
                debug!(layer_id = layer_id, "Layer has no loaded features");
                return Arc::new(Vec::new());
            }
        };

        if self.kind == ServiceKind::TiledVectorService {
            Arc::new(dedupe_by_id(&features))
        } else {
            features
        }
    }
}

fn dedupe_by_id(features: &[Feature]) -> Vec<Feature> {
    let mut seen = HashSet::new();
    features
        .iter()
        .filter(|f| seen.insert(f.id.as_str()))
        .cloned()
        .collect()
}

impl FilterInterface for InMemoryInterface {
    fn kind(&self) -> ServiceKind {
        self.kind
    }

    fn is_external(&self) -> bool {
        false
    }

    fn describe_attributes(
        &self,
        service: Arc<ServiceDescriptor>,
    ) -> InterfaceFuture<Vec<AttributeDescription>> {
        let features = self.snapshot(service.layer_id());
        Box::pin(async move { Ok(infer_attributes(&features)) })
    }

    fn get_value_range(
        &self,
        service: Arc<ServiceDescriptor>,
        attr_name: String,
        flags: RangeFlags,
        extent: Option<Extent>,
    ) -> InterfaceFuture<ValueRange> {
        let features = self.snapshot(service.layer_id());
        let chunk_size = self.chunk_size;
        Box::pin(async move {
            let eval = Evaluation::new(&features, extent, chunk_size);
            Ok(eval.value_range(&attr_name, flags).await)
        })
    }

    fn get_unique_values(
        &self,
        service: Arc<ServiceDescriptor>,
        attr_name: String,
        flags: UniqueValueFlags,
        extent: Option<Extent>,
    ) -> InterfaceFuture<Vec<Value>> {
        let features = self.snapshot(service.layer_id());
        let chunk_size = self.chunk_size;
        Box::pin(async move {
            let eval = Evaluation::new(&features, extent, chunk_size);
            Ok(eval
                .unique_values(&attr_name, flags.delimiter.as_deref())
                .await)
        })
    }

    fn run_filter_query(
        &self,
        service: Arc<ServiceDescriptor>,
        query: FilterQuery,
        extent: Option<Extent>,
    ) -> InterfaceFuture<Vec<Feature>> {
        let features = self.snapshot(service.layer_id());
        let chunk_size = self.chunk_size;
        Box::pin(async move {
            let predicate = Predicate::from_query(&query);
            let eval = Evaluation::new(&features, extent, chunk_size);
            let selected = eval.select(predicate.as_ref()).await;
            debug!(
                total = features.len(),
                selected = selected.len(),
                "Filter evaluated in memory"
            );
            Ok(selected)
        })
    }
}
