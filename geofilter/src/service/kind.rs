//! Backend service kinds.

use crate::error::FilterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five backend kinds a layer can be filtered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceKind {
    /// OGC Web Feature Service; the only kind with server-side filtering.
    VectorFeatureService,
    /// OGC API Features style REST collections.
    QueryableFeatureService,
    /// Plain GeoJSON payloads.
    StaticFeatureService,
    /// Sensor/observation service (SensorThings).
    ObservationService,
    /// Tiled vector data rendered from vector tiles.
    TiledVectorService,
}

impl ServiceKind {
    /// All kinds, in registry order.
    pub const ALL: [ServiceKind; 5] = [
        Self::VectorFeatureService,
        Self::QueryableFeatureService,
        Self::StaticFeatureService,
        Self::ObservationService,
        Self::TiledVectorService,
    ];

    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VectorFeatureService => "vector-feature-service",
            Self::QueryableFeatureService => "queryable-feature-service",
            Self::StaticFeatureService => "static-feature-service",
            Self::ObservationService => "observation-service",
            Self::TiledVectorService => "tiled-vector-service",
        }
    }

    /// Whether filters for this kind can be evaluated by the remote service.
    pub fn supports_external(&self) -> bool {
        matches!(self, Self::VectorFeatureService)
    }

    /// Whether the (kind, externality) pair is a supported combination.
    pub fn supports(&self, external: bool) -> bool {
        !external || self.supports_external()
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = FilterError;

    /// Parses canonical names and the layer-type names used in portal configs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vector-feature-service" | "wfs" => Ok(Self::VectorFeatureService),
            "queryable-feature-service" | "oaf" => Ok(Self::QueryableFeatureService),
            "static-feature-service" | "geojson" => Ok(Self::StaticFeatureService),
            "observation-service" | "sensorthings" => Ok(Self::ObservationService),
            "tiled-vector-service" | "vectortile" => Ok(Self::TiledVectorService),
            _ => Err(FilterError::UnknownKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_and_aliases() {
        assert_eq!(
            "vector-feature-service".parse::<ServiceKind>().unwrap(),
            ServiceKind::VectorFeatureService
        );
        assert_eq!("WFS".parse::<ServiceKind>().unwrap(), ServiceKind::VectorFeatureService);
        assert_eq!("GeoJSON".parse::<ServiceKind>().unwrap(), ServiceKind::StaticFeatureService);
        assert_eq!(
            "SensorThings".parse::<ServiceKind>().unwrap(),
            ServiceKind::ObservationService
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = "WMS".parse::<ServiceKind>().unwrap_err();
        assert_eq!(err, FilterError::UnknownKind("WMS".to_string()));
    }

    #[test]
    fn test_support_matrix() {
        for kind in ServiceKind::ALL {
            assert!(kind.supports(false), "{} must support internal", kind);
        }
        assert!(ServiceKind::VectorFeatureService.supports(true));
        assert!(!ServiceKind::QueryableFeatureService.supports(true));
        assert!(!ServiceKind::StaticFeatureService.supports(true));
        assert!(!ServiceKind::ObservationService.supports(true));
        assert!(!ServiceKind::TiledVectorService.supports(true));
    }

    #[test]
    fn test_display_round_trips() {
        for kind in ServiceKind::ALL {
            assert_eq!(kind.to_string().parse::<ServiceKind>().unwrap(), kind);
        }
    }
}
