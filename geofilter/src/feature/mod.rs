//! In-memory feature model.
//!
//! Features are the unit every filter operation works on: internal interfaces
//! evaluate predicates over features already held by a layer, external
//! interfaces decode the features a remote service returns.
//!
//! Attribute values stay as loosely typed JSON values. Comparison helpers in
//! [`value`] decide numeric vs. string semantics per comparison, which is what
//! attribute data from mixed backends needs (a WFS reports `"42"` where a
//! GeoJSON payload carries `42`).

mod geojson;
mod types;
pub mod value;

pub use geojson::{parse_feature_collection, FeatureCollection};
pub use types::{Extent, Feature};
