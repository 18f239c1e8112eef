//! Lookup of interface implementations by (kind, externality).

use super::{FilterInterface, InMemoryInterface, UnsupportedInterface, WfsInterface};
use crate::config::QuerySettings;
use crate::http::AsyncHttpClient;
use crate::layer::LayerSource;
use crate::service::ServiceKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Fixed table of interface implementations, built once per process.
#[derive(Default)]
pub struct InterfaceRegistry {
    interfaces: HashMap<(ServiceKind, bool), Arc<dyn FilterInterface>>,
}

impl InterfaceRegistry {
    /// Builds the full table: an in-memory interface per kind, the WFS
    /// interface for external vector feature services and an unsupported
    /// placeholder for every other external kind.
    pub fn new<C: AsyncHttpClient + 'static>(
        client: C,
        layers: Arc<dyn LayerSource>,
        settings: &QuerySettings,
    ) -> Self {
        let client = Arc::new(client);
        let mut registry = Self::empty();

        for kind in ServiceKind::ALL {
            registry.register(Arc::new(InMemoryInterface::new(
                kind,
                Arc::clone(&layers),
                settings.evaluation_chunk_size,
            )));

            if kind.supports_external() {
                registry.register(Arc::new(WfsInterface::new(
                    Arc::clone(&client),
                    settings.max_features,
                    settings.evaluation_chunk_size,
                )));
            } else {
                registry.register(Arc::new(UnsupportedInterface::new(kind)));
            }
        }

        registry
    }

    /// A registry with no implementations.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds an implementation under its own (kind, externality), returning
    /// the one it replaces.
    pub fn register(
        &mut self,
        interface: Arc<dyn FilterInterface>,
    ) -> Option<Arc<dyn FilterInterface>> {
        self.interfaces
            .insert((interface.kind(), interface.is_external()), interface)
    }

    pub fn get(&self, kind: ServiceKind, external: bool) -> Option<Arc<dyn FilterInterface>> {
        self.interfaces.get(&(kind, external)).cloned()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }
}
