//! Layer metadata and the service descriptor built from it.

use super::kind::ServiceKind;
use crate::error::FilterError;
use serde::{Deserialize, Serialize};

/// Layer configuration as supplied by the layer collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Layer type name, e.g. `"WFS"` or `"vector-feature-service"`.
    pub kind: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "featureType")]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    /// Feature namespace, `<uri>/<prefix>`.
    #[serde(default, alias = "featureNS")]
    pub namespace: Option<String>,
    #[serde(default, alias = "geometryName")]
    pub geometry_name: Option<String>,
    /// Maximum number of features per request.
    #[serde(default)]
    pub limit: Option<u32>,
}

impl LayerMetadata {
    /// Metadata with only the kind set.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_feature_type(mut self, feature_type: impl Into<String>) -> Self {
        self.feature_type = Some(feature_type.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_geometry_name(mut self, name: impl Into<String>) -> Self {
        self.geometry_name = Some(name.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A feature namespace split into URI and prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub raw: String,
    pub uri: String,
    pub prefix: String,
}

impl Namespace {
    /// Splits `http://example.org/app` into uri `http://example.org` and prefix `app`.
    ///
    /// The split is always at the last `/`, so only the final segment is the
    /// prefix and the URI keeps any inner path. A namespace URI that already
    /// ends in the prefix is written with the prefix repeated, as in
    /// `http://example.org/app/app`. A value without any `/` is taken as a
    /// bare prefix with an empty URI.
    pub fn parse(raw: &str) -> Self {
        let (uri, prefix) = raw.rsplit_once('/').unwrap_or(("", raw));
        Self {
            raw: raw.to_string(),
            uri: uri.to_string(),
            prefix: prefix.to_string(),
        }
    }
}

/// Immutable binding of one layer to one backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptor {
    kind: ServiceKind,
    external: bool,
    layer_id: String,
    url: Option<String>,
    feature_types: Vec<String>,
    collection: Option<String>,
    namespace: Option<Namespace>,
    srs_name: Option<String>,
    geometry_name: Option<String>,
    limit: Option<u32>,
}

impl ServiceDescriptor {
    /// Builds and validates a descriptor for a layer.
    ///
    /// `srs_name` is the map's current coordinate reference identifier and is
    /// only recorded for vector feature services.
    ///
    /// # Errors
    ///
    /// - [`FilterError::UnknownKind`] if `metadata.kind` is not recognised
    /// - [`FilterError::UnsupportedOperation`] for external evaluation of a kind
    ///   that only evaluates in memory
    /// - [`FilterError::Configuration`] if required fields are missing
    pub fn bind(
        layer_id: &str,
        metadata: &LayerMetadata,
        external: bool,
        srs_name: &str,
    ) -> Result<Self, FilterError> {
        let kind: ServiceKind = metadata.kind.parse()?;

        if !kind.supports(external) {
            return Err(FilterError::UnsupportedOperation { kind, external });
        }

        let mut descriptor = Self {
            kind,
            external,
            layer_id: layer_id.to_string(),
            url: metadata.url.clone(),
            feature_types: Vec::new(),
            collection: None,
            namespace: None,
            srs_name: None,
            geometry_name: None,
            limit: metadata.limit,
        };

        match kind {
            ServiceKind::VectorFeatureService => {
                let feature_type = metadata.feature_type.clone().ok_or_else(|| {
                    FilterError::Configuration(format!(
                        "layer {} has no feature type",
                        layer_id
                    ))
                })?;
                if external && metadata.url.is_none() {
                    return Err(FilterError::Configuration(format!(
                        "layer {} has no service url",
                        layer_id
                    )));
                }
                descriptor.feature_types = vec![feature_type];
                descriptor.namespace = metadata.namespace.as_deref().map(Namespace::parse);
                descriptor.srs_name = Some(srs_name.to_string());
                descriptor.geometry_name = metadata.geometry_name.clone();
            }
            ServiceKind::QueryableFeatureService => {
                descriptor.collection = metadata
                    .collection
                    .clone()
                    .or_else(|| metadata.feature_type.clone());
            }
            ServiceKind::StaticFeatureService
            | ServiceKind::ObservationService
            | ServiceKind::TiledVectorService => {}
        }

        Ok(descriptor)
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn is_external(&self) -> bool {
        self.external
    }

    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn feature_types(&self) -> &[String] {
        &self.feature_types
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    pub fn srs_name(&self) -> Option<&str> {
        self.srs_name.as_deref()
    }

    pub fn geometry_name(&self) -> Option<&str> {
        self.geometry_name.as_deref()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Qualified type names (`prefix:type`) for request parameters.
    pub fn qualified_type_names(&self) -> Vec<String> {
        match self.namespace.as_ref().filter(|ns| !ns.prefix.is_empty()) {
            Some(ns) => self
                .feature_types
                .iter()
                .map(|t| format!("{}:{}", ns.prefix, t))
                .collect(),
            None => self.feature_types.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wfs_metadata() -> LayerMetadata {
        LayerMetadata::new("vector-feature-service")
            .with_namespace("http://example.org/app")
            .with_url("http://svc")
            .with_feature_type("parcels")
    }

    #[test]
    fn test_namespace_split() {
        let d = ServiceDescriptor::bind("parcels-layer", &wfs_metadata(), false, "EPSG:25832")
            .unwrap();
        let ns = d.namespace().unwrap();
        assert_eq!(ns.uri, "http://example.org");
        assert_eq!(ns.prefix, "app");
        assert_eq!(ns.raw, "http://example.org/app");
        assert_eq!(d.feature_types(), ["parcels".to_string()]);
        assert_eq!(d.srs_name(), Some("EPSG:25832"));
    }

    #[test]
    fn test_namespace_splits_at_last_slash() {
        let ns = Namespace::parse("http://example.org/app/app");
        assert_eq!(ns.uri, "http://example.org/app");
        assert_eq!(ns.prefix, "app");

        let ns = Namespace::parse("http://example.org/ns/v2/gml");
        assert_eq!(ns.uri, "http://example.org/ns/v2");
        assert_eq!(ns.prefix, "gml");
    }

    #[test]
    fn test_namespace_without_slash_is_prefix() {
        let ns = Namespace::parse("app");
        assert_eq!(ns.uri, "");
        assert_eq!(ns.prefix, "app");
    }

    #[test]
    fn test_qualified_type_names() {
        let d = ServiceDescriptor::bind("l", &wfs_metadata(), true, "EPSG:4326").unwrap();
        assert_eq!(d.qualified_type_names(), vec!["app:parcels".to_string()]);
    }

    #[test]
    fn test_unsupported_external_kinds() {
        for kind in [
            "queryable-feature-service",
            "static-feature-service",
            "observation-service",
            "tiled-vector-service",
        ] {
            let err = ServiceDescriptor::bind("l", &LayerMetadata::new(kind), true, "EPSG:4326")
                .unwrap_err();
            assert!(
                matches!(err, FilterError::UnsupportedOperation { external: true, .. }),
                "{} should reject external",
                kind
            );
            assert!(err.to_string().contains("unsupported"));
        }
    }

    #[test]
    fn test_internal_kinds_bind() {
        for kind in ServiceKind::ALL {
            let metadata = LayerMetadata::new(kind.as_str()).with_feature_type("t");
            let d = ServiceDescriptor::bind("l", &metadata, false, "EPSG:4326").unwrap();
            assert_eq!(d.kind(), kind);
            assert!(!d.is_external());
        }
    }

    #[test]
    fn test_unknown_kind() {
        let err = ServiceDescriptor::bind("l", &LayerMetadata::new("WMS"), false, "EPSG:4326")
            .unwrap_err();
        assert!(matches!(err, FilterError::UnknownKind(_)));
        assert!(err.to_string().contains("unknown layer type"));
    }

    #[test]
    fn test_external_wfs_requires_url() {
        let metadata = LayerMetadata::new("wfs").with_feature_type("parcels");
        let err = ServiceDescriptor::bind("l", &metadata, true, "EPSG:4326").unwrap_err();
        assert!(matches!(err, FilterError::Configuration(_)));

        // Internal evaluation does not need the endpoint
        assert!(ServiceDescriptor::bind("l", &metadata, false, "EPSG:4326").is_ok());
    }

    #[test]
    fn test_wfs_requires_feature_type() {
        let metadata = LayerMetadata::new("wfs").with_url("http://svc");
        let err = ServiceDescriptor::bind("l", &metadata, true, "EPSG:4326").unwrap_err();
        assert!(err.to_string().contains("no feature type"));
    }

    #[test]
    fn test_queryable_collection_falls_back_to_feature_type() {
        let metadata = LayerMetadata::new("oaf").with_feature_type("schools");
        let d = ServiceDescriptor::bind("l", &metadata, false, "EPSG:4326").unwrap();
        assert_eq!(d.collection(), Some("schools"));
    }

    #[test]
    fn test_metadata_deserializes_portal_field_names() {
        let metadata: LayerMetadata = serde_json::from_str(
            r#"{"kind":"WFS","url":"http://svc","featureType":"parcels","featureNS":"http://example.org/app"}"#,
        )
        .unwrap();
        assert_eq!(metadata.feature_type.as_deref(), Some("parcels"));
        assert_eq!(metadata.namespace.as_deref(), Some("http://example.org/app"));
    }
}
