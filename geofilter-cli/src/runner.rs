//! CLI runner for common setup.
//!
//! Encapsulates configuration loading, logging initialization and the wiring
//! of a dispatcher to reduce duplication across command handlers.

use crate::commands::source::{LoadedSource, SourceArgs};
use crate::error::CliError;
use geofilter::config::ConfigFile;
use geofilter::coordinator::QueryCoordinator;
use geofilter::dispatch::QueryDispatcher;
use geofilter::http::AsyncReqwestClient;
use geofilter::interface::InterfaceRegistry;
use geofilter::layer::{LayerSource, MapView, MemoryLayerSource, StaticMapView};
use geofilter::logging::{init_logging, LoggingGuard};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Loads the configuration (default path unless `config_path` is given)
    /// and initializes logging.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let logging_guard =
            init_logging(&config.logging).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("geofilter v{}", geofilter::VERSION);
        info!("geofilter CLI: {} command", command);
    }

    /// Loads the source and binds a dispatcher to it.
    pub fn bind(&self, source: &SourceArgs) -> Result<QueryDispatcher, CliError> {
        let layers = Arc::new(MemoryLayerSource::new());
        let loaded: LoadedSource = source.load(&layers)?;

        let srs_name = source
            .srs
            .clone()
            .unwrap_or_else(|| self.config.query.default_srs.clone());
        let mut map = StaticMapView::new(srs_name);
        if let Some(extent) = source.extent()? {
            map = map.with_extent(extent);
        }

        let client = AsyncReqwestClient::new(&self.config.http)
            .map_err(|e| CliError::Config(e.to_string()))?;
        let layer_source: Arc<dyn LayerSource> = layers;
        let registry = InterfaceRegistry::new(client, layer_source, &self.config.query);
        let map: Arc<dyn MapView> = Arc::new(map);

        let dispatcher =
            QueryDispatcher::new(Arc::new(QueryCoordinator::new()), Arc::new(registry), map);
        dispatcher.bind_service(&loaded.layer_id, &loaded.metadata, loaded.external)?;
        Ok(dispatcher)
    }

    /// Prints a result as pretty JSON on stdout.
    pub fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), CliError> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}
