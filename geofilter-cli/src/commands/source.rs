//! Layer source arguments shared by all query commands.

use crate::error::CliError;
use clap::Args;
use geofilter::error::FilterError;
use geofilter::feature::{parse_feature_collection, Extent};
use geofilter::layer::MemoryLayerSource;
use geofilter::service::LayerMetadata;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Where the features come from.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// GeoJSON FeatureCollection file, evaluated in memory
    #[arg(long, value_name = "FILE", conflicts_with = "wfs")]
    pub geojson: Option<PathBuf>,

    /// Layer type reported for --geojson (geojson, oaf, sensorthings, vectortile, wfs)
    #[arg(long, default_value = "geojson")]
    pub kind: String,

    /// WFS endpoint, filtered by the service itself
    #[arg(long, value_name = "URL")]
    pub wfs: Option<String>,

    /// Feature type name (required with --wfs)
    #[arg(long)]
    pub feature_type: Option<String>,

    /// Feature namespace as <uri>/<prefix>
    #[arg(long)]
    pub namespace: Option<String>,

    /// Geometry attribute name (discovered from the service when omitted)
    #[arg(long)]
    pub geometry_name: Option<String>,

    /// Maximum number of features per request
    #[arg(long)]
    pub limit: Option<u32>,

    /// Coordinate reference system of the map (default from config)
    #[arg(long)]
    pub srs: Option<String>,

    /// Visible map extent as minx,miny,maxx,maxy
    #[arg(long, value_name = "BBOX", allow_hyphen_values = true)]
    pub extent: Option<String>,
}

/// A source ready to bind.
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub layer_id: String,
    pub metadata: LayerMetadata,
    pub external: bool,
}

impl SourceArgs {
    /// Resolves the source, loading GeoJSON features into `layers`.
    pub fn load(&self, layers: &MemoryLayerSource) -> Result<LoadedSource, CliError> {
        match (&self.geojson, &self.wfs) {
            (Some(path), None) => {
                let body = fs::read(path).map_err(|error| CliError::FileRead {
                    path: path.display().to_string(),
                    error,
                })?;
                let features = parse_feature_collection(&body).map_err(FilterError::from)?;
                let layer_id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "layer".to_string());

                info!(layer = %layer_id, features = features.len(), "Loaded GeoJSON layer");
                layers.set_features(layer_id.clone(), features);

                let mut metadata = LayerMetadata::new(self.kind.as_str());
                if let Some(feature_type) = &self.feature_type {
                    metadata = metadata.with_feature_type(feature_type.as_str());
                }
                Ok(LoadedSource {
                    layer_id,
                    metadata,
                    external: false,
                })
            }
            (None, Some(url)) => {
                let feature_type = self.feature_type.clone().ok_or_else(|| {
                    CliError::Source("--wfs requires --feature-type".to_string())
                })?;

                let mut metadata = LayerMetadata::new("WFS")
                    .with_url(url.as_str())
                    .with_feature_type(feature_type.as_str());
                if let Some(namespace) = &self.namespace {
                    metadata = metadata.with_namespace(namespace.as_str());
                }
                if let Some(geometry_name) = &self.geometry_name {
                    metadata = metadata.with_geometry_name(geometry_name.as_str());
                }
                if let Some(limit) = self.limit {
                    metadata = metadata.with_limit(limit);
                }
                Ok(LoadedSource {
                    layer_id: feature_type,
                    metadata,
                    external: true,
                })
            }
            (Some(_), Some(_)) => Err(CliError::Source(
                "--geojson and --wfs cannot be combined".to_string(),
            )),
            (None, None) => Err(CliError::Source(
                "one of --geojson or --wfs is required".to_string(),
            )),
        }
    }

    /// Parses `--extent`, if given.
    pub fn extent(&self) -> Result<Option<Extent>, CliError> {
        self.extent.as_deref().map(parse_extent).transpose()
    }
}

/// Parses `minx,miny,maxx,maxy`.
pub fn parse_extent(raw: &str) -> Result<Extent, CliError> {
    let coords = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CliError::Source(format!("invalid extent '{}': {}", raw, e)))?;

    match coords.as_slice() {
        [x1, y1, x2, y2] => Ok(Extent::new(*x1, *y1, *x2, *y2)),
        _ => Err(CliError::Source(format!(
            "invalid extent '{}': expected minx,miny,maxx,maxy",
            raw
        ))),
    }
}
