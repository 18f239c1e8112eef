//! Backend interfaces answering the four filter questions.
//!
//! Every (service kind, externality) pair is served by one [`FilterInterface`]
//! implementation held in the [`InterfaceRegistry`]:
//!
//! | kind | internal | external |
//! |---|---|---|
//! | vector-feature-service | [`InMemoryInterface`] | [`WfsInterface`] |
//! | every other kind | [`InMemoryInterface`] | [`UnsupportedInterface`] |
//!
//! Methods return boxed `'static` futures so the coordinator can spawn them.
//! Any extent passed in has already been resolved from the map by the
//! dispatcher, so the same extent feeds the dedup key and the query.

mod evaluate;
mod memory;
mod registry;
mod unsupported;
mod wfs;

pub use memory::InMemoryInterface;
pub use registry::InterfaceRegistry;
pub use unsupported::UnsupportedInterface;
pub use wfs::WfsInterface;

use crate::error::FilterError;
use crate::feature::{Extent, Feature};
use crate::rule::FilterQuery;
use crate::service::{ServiceDescriptor, ServiceKind};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result type of every interface method.
pub type InterfaceFuture<T> = BoxFuture<'static, Result<T, FilterError>>;

/// Capability set of one backend.
pub trait FilterInterface: Send + Sync {
    /// Kind this implementation serves.
    fn kind(&self) -> ServiceKind;

    /// True if queries are executed by the remote service.
    fn is_external(&self) -> bool;

    /// Lists the attributes of the layer's features.
    fn describe_attributes(
        &self,
        service: Arc<ServiceDescriptor>,
    ) -> InterfaceFuture<Vec<AttributeDescription>>;

    /// Smallest and largest value of an attribute.
    fn get_value_range(
        &self,
        service: Arc<ServiceDescriptor>,
        attr_name: String,
        flags: RangeFlags,
        extent: Option<Extent>,
    ) -> InterfaceFuture<ValueRange>;

    /// Distinct values of an attribute, sorted.
    fn get_unique_values(
        &self,
        service: Arc<ServiceDescriptor>,
        attr_name: String,
        flags: UniqueValueFlags,
        extent: Option<Extent>,
    ) -> InterfaceFuture<Vec<Value>>;

    /// Features matching the query.
    fn run_filter_query(
        &self,
        service: Arc<ServiceDescriptor>,
        query: FilterQuery,
        extent: Option<Extent>,
    ) -> InterfaceFuture<Vec<Feature>>;
}

/// Coarse attribute data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Integer,
    Number,
    Boolean,
    Date,
    Geometry,
    Unknown,
}

impl AttributeType {
    /// Maps an XML schema type name (`xsd:int`, `gml:PointPropertyType`, ...).
    pub fn from_schema_type(name: &str) -> Self {
        if name.starts_with("gml:") {
            return Self::Geometry;
        }
        let local = name.rsplit(':').next().unwrap_or(name).to_ascii_lowercase();
        match local.as_str() {
            "string" => Self::String,
            "int" | "integer" | "long" | "short" | "byte" => Self::Integer,
            "number" | "double" | "float" | "decimal" => Self::Number,
            "boolean" => Self::Boolean,
            "date" | "datetime" | "date-time" | "time" => Self::Date,
            l if l.ends_with("propertytype") => Self::Geometry,
            _ => Self::Unknown,
        }
    }
}

/// One attribute of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescription {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: AttributeType,
}

impl AttributeDescription {
    pub fn new(name: impl Into<String>, data_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Bounds of an attribute; `None` when not requested or no value exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Option<Value>,
    pub max: Option<Value>,
}

/// Options for [`FilterInterface::get_value_range`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeFlags {
    /// Compute only the minimum.
    #[serde(default)]
    pub min_only: bool,
    /// Compute only the maximum.
    #[serde(default)]
    pub max_only: bool,
    /// Restrict to features in the visible map extent.
    #[serde(default)]
    pub only_visible: bool,
}

/// Options for [`FilterInterface::get_unique_values`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueValueFlags {
    /// Restrict to features in the visible map extent.
    #[serde(default)]
    pub only_visible: bool,
    /// Split stored values on this separator before collecting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

/// Any result an interface produces; the cached form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Attributes(Vec<AttributeDescription>),
    ValueRange(ValueRange),
    UniqueValues(Vec<Value>),
    Features(Vec<Feature>),
}

impl QueryOutput {
    /// Variant name, for contract error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Attributes(_) => "attributes",
            Self::ValueRange(_) => "value range",
            Self::UniqueValues(_) => "unique values",
            Self::Features(_) => "features",
        }
    }
}
