//! GeoJSON FeatureCollection decoding.
//!
//! Only what filtering needs is kept: the feature id, the properties object
//! and the bounding box of the geometry. Coordinates of any nesting depth are
//! folded into the extent, so every geometry type is handled the same way.

use super::types::{Extent, Feature};
use crate::error::TransportError;
use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw FeatureCollection as served by feature services.
#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    #[serde(default)]
    coordinates: Option<Value>,
    #[serde(default)]
    geometries: Option<Vec<RawGeometry>>,
}

impl FeatureCollection {
    /// Converts raw features, assigning positional ids where none are given.
    pub fn into_features(self) -> Vec<Feature> {
        self.features
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.into_feature(index))
            .collect()
    }
}

impl RawFeature {
    fn into_feature(self, index: usize) -> Feature {
        let id = match self.id {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => format!("feature-{}", index),
        };

        let extent = self.geometry.as_ref().and_then(RawGeometry::extent);

        Feature {
            id,
            properties: self.properties.unwrap_or_default(),
            extent,
        }
    }
}

impl RawGeometry {
    fn extent(&self) -> Option<Extent> {
        let mut extent = None;
        if let Some(coords) = &self.coordinates {
            fold_coordinates(coords, &mut extent);
        }
        for child in self.geometries.iter().flatten() {
            if let Some(child_extent) = child.extent() {
                merge(&mut extent, child_extent.min_x, child_extent.min_y);
                merge(&mut extent, child_extent.max_x, child_extent.max_y);
            }
        }
        extent
    }
}

fn fold_coordinates(value: &Value, extent: &mut Option<Extent>) {
    let Value::Array(items) = value else {
        return;
    };

    // A position is an array whose first two members are numbers
    if let (Some(x), Some(y)) = (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        merge(extent, x, y);
        return;
    }

    for item in items {
        fold_coordinates(item, extent);
    }
}

fn merge(extent: &mut Option<Extent>, x: f64, y: f64) {
    match extent {
        Some(e) => e.include(x, y),
        None => *extent = Some(Extent::point(x, y)),
    }
}

/// Decodes a GeoJSON FeatureCollection body into features.
pub fn parse_feature_collection(body: &[u8]) -> Result<Vec<Feature>, TransportError> {
    let collection: FeatureCollection = serde_json::from_slice(body)
        .map_err(|e| TransportError::InvalidResponse(format!("not a FeatureCollection: {}", e)))?;
    Ok(collection.into_features())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_points_and_polygons() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": "parcels.1",
                    "properties": {"district": "A"},
                    "geometry": {"type": "Point", "coordinates": [10.0, 53.5]}
                },
                {
                    "type": "Feature",
                    "id": 7,
                    "properties": {"district": "B"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 0.0]]]
                    }
                }
            ]
        });

        let features = parse_feature_collection(body.to_string().as_bytes()).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, "parcels.1");
        assert_eq!(features[0].extent, Some(Extent::point(10.0, 53.5)));
        assert_eq!(features[1].id, "7");
        assert_eq!(features[1].extent, Some(Extent::new(0.0, 0.0, 4.0, 3.0)));
    }

    #[test]
    fn test_missing_id_and_geometry() {
        let body = json!({
            "features": [{"properties": {"name": "x"}, "geometry": null}]
        });
        let features = parse_feature_collection(body.to_string().as_bytes()).unwrap();
        assert_eq!(features[0].id, "feature-0");
        assert!(features[0].extent.is_none());
    }

    #[test]
    fn test_geometry_collection_extent() {
        let body = json!({
            "features": [{
                "id": "gc",
                "properties": {},
                "geometry": {
                    "type": "GeometryCollection",
                    "geometries": [
                        {"type": "Point", "coordinates": [1.0, 1.0]},
                        {"type": "LineString", "coordinates": [[-1.0, 2.0], [3.0, 5.0]]}
                    ]
                }
            }]
        });
        let features = parse_feature_collection(body.to_string().as_bytes()).unwrap();
        assert_eq!(features[0].extent, Some(Extent::new(-1.0, 1.0, 3.0, 5.0)));
    }

    #[test]
    fn test_invalid_body_is_invalid_response() {
        let result = parse_feature_collection(b"<ows:ExceptionReport/>");
        assert!(matches!(result, Err(TransportError::InvalidResponse(_))));
    }
}
