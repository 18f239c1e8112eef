//! Service descriptors.
//!
//! A [`ServiceDescriptor`] records which backend a filter-bound layer talks to
//! and how. It is derived from [`LayerMetadata`] once, validated against the
//! supported (kind, externality) combinations, and never mutated afterwards;
//! rebinding a layer produces a new descriptor.

mod descriptor;
mod kind;

pub use descriptor::{LayerMetadata, Namespace, ServiceDescriptor};
pub use kind::ServiceKind;
