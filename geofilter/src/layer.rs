//! Collaborators supplying features and map state.
//!
//! Internal interfaces read features that a layer already holds; external
//! interfaces need the map's reference system and visible extent to build
//! spatial constraints. Both are injected behind traits so the dispatch core
//! never depends on a concrete map implementation.

use crate::feature::{Extent, Feature};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Source of already-loaded layer features.
pub trait LayerSource: Send + Sync {
    /// Returns the features currently held by the layer, or `None` if the
    /// layer is unknown.
    fn features(&self, layer_id: &str) -> Option<Arc<Vec<Feature>>>;
}

/// Current map state.
pub trait MapView: Send + Sync {
    /// Coordinate reference identifier, e.g. `EPSG:25832`.
    fn srs_name(&self) -> String;

    /// Currently visible extent, if the map has been laid out.
    fn extent(&self) -> Option<Extent>;
}

/// Layer source backed by a concurrent map of layer id → features.
#[derive(Default)]
pub struct MemoryLayerSource {
    layers: DashMap<String, Arc<Vec<Feature>>>,
}

impl MemoryLayerSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the features of a layer.
    pub fn set_features(&self, layer_id: impl Into<String>, features: Vec<Feature>) {
        self.layers.insert(layer_id.into(), Arc::new(features));
    }

    /// Removes a layer; returns true if it existed.
    pub fn remove(&self, layer_id: &str) -> bool {
        self.layers.remove(layer_id).is_some()
    }
}

impl LayerSource for MemoryLayerSource {
    fn features(&self, layer_id: &str) -> Option<Arc<Vec<Feature>>> {
        self.layers.get(layer_id).map(|entry| Arc::clone(entry.value()))
    }
}

/// Map view with a fixed reference system and a settable extent.
pub struct StaticMapView {
    srs_name: String,
    extent: RwLock<Option<Extent>>,
}

impl StaticMapView {
    pub fn new(srs_name: impl Into<String>) -> Self {
        Self {
            srs_name: srs_name.into(),
            extent: RwLock::new(None),
        }
    }

    pub fn with_extent(self, extent: Extent) -> Self {
        *self.extent.write() = Some(extent);
        self
    }

    /// Updates the visible extent (e.g. after a pan or zoom).
    pub fn set_extent(&self, extent: Option<Extent>) {
        *self.extent.write() = extent;
    }
}

impl MapView for StaticMapView {
    fn srs_name(&self) -> String {
        self.srs_name.clone()
    }

    fn extent(&self) -> Option<Extent> {
        *self.extent.read()
    }
}
