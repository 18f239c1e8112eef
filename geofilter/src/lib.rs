//! geofilter - filter query dispatch and caching for geodata layers
//!
//! Answers four questions for a filter-bound layer, against whichever backend
//! holds its features: which attributes exist, what range an attribute spans,
//! which distinct values it takes, and which features satisfy a set of
//! declarative rules. Concurrent identical questions are computed once and
//! shared through a process-wide cache.
//!
//! # High-Level API
//!
//! ```ignore
//! use geofilter::prelude::*;
//!
//! let layers = Arc::new(MemoryLayerSource::new());
//! let registry = InterfaceRegistry::new(
//!     AsyncReqwestClient::new(&config.http)?,
//!     layers.clone(),
//!     &config.query,
//! );
//! let dispatcher = QueryDispatcher::new(
//!     Arc::new(QueryCoordinator::new()),
//!     Arc::new(registry),
//!     Arc::new(StaticMapView::new("EPSG:25832")),
//! );
//!
//! dispatcher.bind_service("schools", &metadata, true)?;
//! let districts = dispatcher
//!     .get_unique_values("district", UniqueValueFlags::default())
//!     .await?;
//! ```

pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod feature;
pub mod http;
pub mod interface;
pub mod interval;
pub mod layer;
pub mod logging;
pub mod rule;
pub mod service;

/// Version of the geofilter library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used types.
pub mod prelude {
    pub use crate::config::ConfigFile;
    pub use crate::coordinator::{Dispatch, QueryCoordinator};
    pub use crate::dispatch::{Operation, QueryDispatcher};
    pub use crate::error::{FilterError, TransportError};
    pub use crate::feature::{Extent, Feature};
    pub use crate::http::{AsyncHttpClient, AsyncReqwestClient};
    pub use crate::interface::{
        AttributeDescription, AttributeType, InterfaceRegistry, QueryOutput, RangeFlags,
        UniqueValueFlags, ValueRange,
    };
    pub use crate::interval::IntervalRegister;
    pub use crate::layer::{LayerSource, MapView, MemoryLayerSource, StaticMapView};
    pub use crate::rule::{Combinator, FilterQuery, FilterRule, Operator, RuleValue};
    pub use crate::service::{LayerMetadata, ServiceDescriptor, ServiceKind};
    pub use std::sync::Arc;
}
