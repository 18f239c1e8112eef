//! External interface for OGC Web Feature Services (WFS 1.1.0).
//!
//! Filters are evaluated by the server: rules are encoded as OGC Filter XML
//! and sent with a `GetFeature` request asking for GeoJSON. Rules on delimited
//! attributes are re-checked locally, since the server cannot split segments.
//! Range and unique value queries fetch only the requested attribute, without
//! a feature cap, and reduce locally.

use super::evaluate::Evaluation;
use super::{
    AttributeDescription, AttributeType, FilterInterface, InterfaceFuture, RangeFlags,
    UniqueValueFlags, ValueRange,
};
use crate::error::{FilterError, TransportError};
use crate::feature::{parse_feature_collection, Extent, Feature};
use crate::http::AsyncHttpClient;
use crate::rule::ogc::{encode_filter, PropertyNamespace, SpatialConstraint};
use crate::rule::{FilterQuery, Predicate};
use crate::service::{ServiceDescriptor, ServiceKind};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const WFS_VERSION: &str = "1.1.0";
const JSON_FORMAT: &str = "application/json";

/// WFS interface over an HTTP client.
pub struct WfsInterface<C> {
    client: Arc<C>,
    max_features: u32,
    chunk_size: usize,
}

impl<C: AsyncHttpClient + 'static> WfsInterface<C> {
    /// Creates an interface; `max_features` applies when the layer has no limit.
    pub fn new(client: Arc<C>, max_features: u32, chunk_size: usize) -> Self {
        Self {
            client,
            max_features,
            chunk_size,
        }
    }

    fn request(&self, service: Arc<ServiceDescriptor>) -> WfsRequest<C> {
        WfsRequest {
            client: Arc::clone(&self.client),
            service,
            max_features: self.max_features,
        }
    }
}

/// One operation's view of the client and the bound service.
struct WfsRequest<C> {
    client: Arc<C>,
    service: Arc<ServiceDescriptor>,
    max_features: u32,
}

impl<C: AsyncHttpClient + 'static> WfsRequest<C> {
    fn base_url(&self) -> Result<Url, FilterError> {
        let raw = self.service.url().ok_or_else(|| {
            FilterError::Configuration(format!(
                "layer {} has no service url",
                self.service.layer_id()
            ))
        })?;
        Url::parse(raw).map_err(|e| {
            FilterError::Transport(TransportError::InvalidRequest(format!(
                "invalid service url '{}': {}",
                raw, e
            )))
        })
    }

    fn common_params(&self, request: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("service", "WFS".to_string()),
            ("version", WFS_VERSION.to_string()),
            ("request", request.to_string()),
            ("typeName", self.service.qualified_type_names().join(",")),
        ];
        if let Some(ns) = self
            .service
            .namespace()
            .filter(|ns| !ns.prefix.is_empty() && !ns.uri.is_empty())
        {
            params.push(("namespace", format!("xmlns({}={})", ns.prefix, ns.uri)));
        }
        params
    }

    /// Composes a `DescribeFeatureType` URL.
    fn describe_url(&self) -> Result<String, FilterError> {
        let mut params = self.common_params("DescribeFeatureType");
        params.push(("outputFormat", JSON_FORMAT.to_string()));
        self.compose(params)
    }

    /// Composes a `GetFeature` URL.
    ///
    /// Feature queries are capped at the layer limit (or the configured
    /// maximum); single-attribute requests for ranges and unique values
    /// fetch every feature.
    fn get_feature_url(
        &self,
        property_name: Option<&str>,
        filter: Option<String>,
    ) -> Result<String, FilterError> {
        let mut params = self.common_params("GetFeature");
        if let Some(srs) = self.service.srs_name() {
            params.push(("srsName", srs.to_string()));
        }
        if property_name.is_none() {
            params.push((
                "maxFeatures",
                self.service.limit().unwrap_or(self.max_features).to_string(),
            ));
        }
        params.push(("outputFormat", JSON_FORMAT.to_string()));
        if let Some(property) = property_name {
            params.push(("propertyName", property.to_string()));
        }
        if let Some(filter) = filter {
            params.push(("filter", filter));
        }
        self.compose(params)
    }

    fn compose(&self, params: Vec<(&'static str, String)>) -> Result<String, FilterError> {
        let mut url = self.base_url()?;
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        Ok(url.to_string())
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FilterError> {
        debug!(layer_id = self.service.layer_id(), url = url, "WFS request");
        self.client.get(url).await.map_err(|e| {
            warn!(layer_id = self.service.layer_id(), error = %e, "WFS request failed");
            FilterError::from(e)
        })
    }

    async fn describe(&self) -> Result<Vec<AttributeDescription>, FilterError> {
        let url = self.describe_url()?;
        let body = self.fetch(&url).await?;
        parse_describe_response(&body).map_err(FilterError::from)
    }

    async fn get_features(
        &self,
        property_name: Option<&str>,
        predicate: Option<&Predicate>,
        extent: Option<Extent>,
    ) -> Result<Vec<Feature>, FilterError> {
        let geometry_name = match extent {
            Some(_) => Some(self.geometry_name().await?),
            None => None,
        };
        let spatial = extent.zip(geometry_name.as_deref()).map(|(extent, geometry_name)| {
            SpatialConstraint {
                geometry_name,
                extent,
                srs_name: self.service.srs_name(),
            }
        });
        let namespace = self.service.namespace().map(|ns| PropertyNamespace {
            prefix: &ns.prefix,
            uri: &ns.uri,
        });

        let filter = encode_filter(predicate, spatial.as_ref(), namespace);
        let url = self.get_feature_url(property_name, filter)?;
        let body = self.fetch(&url).await?;
        parse_feature_collection(&body).map_err(FilterError::from)
    }

    /// Geometry attribute used for extent restrictions: configured on the
    /// layer, else the first geometry attribute the service describes.
    async fn geometry_name(&self) -> Result<String, FilterError> {
        if let Some(name) = self.service.geometry_name() {
            return Ok(name.to_string());
        }
        self.describe()
            .await?
            .into_iter()
            .find(|a| a.data_type == AttributeType::Geometry)
            .map(|a| a.name)
            .ok_or_else(|| {
                FilterError::Configuration(format!(
                    "layer {} has no geometry attribute",
                    self.service.layer_id()
                ))
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeResponse {
    #[serde(default)]
    feature_types: Vec<DescribedType>,
}

#[derive(Debug, Deserialize)]
struct DescribedType {
    #[serde(default)]
    properties: Vec<DescribedProperty>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribedProperty {
    name: String,
    #[serde(default, rename = "type")]
    schema_type: Option<String>,
    #[serde(default)]
    local_type: Option<String>,
}

/// Decodes a JSON `DescribeFeatureType` response.
///
/// Properties of several feature types are merged by name.
fn parse_describe_response(body: &[u8]) -> Result<Vec<AttributeDescription>, TransportError> {
    let response: DescribeResponse = serde_json::from_slice(body).map_err(|e| {
        TransportError::InvalidResponse(format!("invalid DescribeFeatureType response: {}", e))
    })?;

    let mut attributes: Vec<AttributeDescription> = Vec::new();
    for property in response.feature_types.into_iter().flat_map(|t| t.properties) {
        if attributes.iter().any(|a| a.name == property.name) {
            continue;
        }
        // The qualified `type` tells geometry apart; localType drops the gml prefix
        let data_type = match (&property.schema_type, &property.local_type) {
            (Some(t), _) if t.starts_with("gml:") => AttributeType::Geometry,
            (_, Some(local)) => AttributeType::from_schema_type(local),
            (Some(t), None) => AttributeType::from_schema_type(t),
            (None, None) => AttributeType::Unknown,
        };
        attributes.push(AttributeDescription::new(property.name, data_type));
    }
    Ok(attributes)
}

impl<C: AsyncHttpClient + 'static> FilterInterface for WfsInterface<C> {
    fn kind(&self) -> ServiceKind {
        ServiceKind::VectorFeatureService
    }

    fn is_external(&self) -> bool {
        true
    }

    fn describe_attributes(
        &self,
        service: Arc<ServiceDescriptor>,
    ) -> InterfaceFuture<Vec<AttributeDescription>> {
        let request = self.request(service);
        Box::pin(async move { request.describe().await })
    }

    fn get_value_range(
        &self,
        service: Arc<ServiceDescriptor>,
        attr_name: String,
        flags: RangeFlags,
        extent: Option<Extent>,
    ) -> InterfaceFuture<ValueRange> {
        let request = self.request(service);
        let chunk_size = self.chunk_size;
        Box::pin(async move {
            let features = request.get_features(Some(&attr_name), None, extent).await?;
            let eval = Evaluation::new(&features, None, chunk_size);
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
        let request = self.request(service);
        let chunk_size = self.chunk_size;
        Box::pin(async move {
            let attributes = request.describe().await?;
            let usable = attributes
                .iter()
                .any(|a| a.name == attr_name && a.data_type != AttributeType::Geometry);
            if !usable {
                debug!(attr_name = %attr_name, "Attribute unknown or geometry, no unique values");
                return Ok(Vec::new());
            }

            let features = request.get_features(Some(&attr_name), None, extent).await?;
            let eval = Evaluation::new(&features, None, chunk_size);
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
        let request = self.request(service);
        Box::pin(async move {
            let predicate = Predicate::from_query(&query);
            let features = request.get_features(None, predicate.as_ref(), extent).await?;
            match predicate.filter(|p| p.uses_delimiter()) {
                Some(predicate) => {
                    let received = features.len();
                    let matching: Vec<Feature> = features
                        .into_iter()
                        .filter(|f| predicate.matches(f))
                        .collect();
                    debug!(
                        received = received,
                        matching = matching.len(),
                        "Re-checked delimited rules locally"
                    );
                    Ok(matching)
                }
                None => Ok(features),
            }
        })
    }
}
