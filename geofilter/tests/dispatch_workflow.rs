//! Integration tests for the dispatch pipeline over in-memory layers.
//!
//! Several dispatchers share one coordinator, the way several filter widgets
//! of a portal share the process-wide cache.

use geofilter::config::{HttpSettings, QuerySettings};
use geofilter::coordinator::{Dispatch, QueryCoordinator};
use geofilter::dispatch::{Operation, QueryDispatcher};
use geofilter::error::FilterError;
use geofilter::feature::{Extent, Feature};
use geofilter::http::AsyncReqwestClient;
use geofilter::interface::{
    AttributeType, InMemoryInterface, InterfaceRegistry, QueryOutput, RangeFlags,
    UniqueValueFlags,
};
use geofilter::interval::IntervalRegister;
use geofilter::layer::{LayerSource, MapView, MemoryLayerSource, StaticMapView};
use geofilter::rule::{FilterQuery, FilterRule, Operator};
use geofilter::service::{LayerMetadata, ServiceKind};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn parcels() -> Vec<Feature> {
    vec![
        Feature::new("p1")
            .with_property("district", "A")
            .with_property("area", 120)
            .with_extent(Extent::point(1.0, 1.0)),
        Feature::new("p2")
            .with_property("district", "B")
            .with_property("area", 45)
            .with_extent(Extent::point(40.0, 40.0)),
        Feature::new("p3")
            .with_property("district", "A")
            .with_property("area", 80)
            .with_extent(Extent::point(3.0, 2.0)),
    ]
}

struct Portal {
    layers: Arc<MemoryLayerSource>,
    map: Arc<StaticMapView>,
    coordinator: Arc<QueryCoordinator>,
    registry: Arc<InterfaceRegistry>,
}

impl Portal {
    fn new() -> Self {
        let layers = Arc::new(MemoryLayerSource::new());
        layers.set_features("parcels", parcels());

        let source: Arc<dyn LayerSource> = layers.clone();
        let client = AsyncReqwestClient::new(&HttpSettings::default()).unwrap();
        let registry = InterfaceRegistry::new(client, source, &QuerySettings::default());

        Self {
            layers,
            map: Arc::new(StaticMapView::new("EPSG:25832")),
            coordinator: Arc::new(QueryCoordinator::new()),
            registry: Arc::new(registry),
        }
    }

    fn dispatcher(&self) -> QueryDispatcher {
        let map: Arc<dyn MapView> = self.map.clone();
        let dispatcher = QueryDispatcher::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.registry),
            map,
        );
        dispatcher
            .bind_service("parcels", &LayerMetadata::new("GeoJSON"), false)
            .unwrap();
        dispatcher
    }
}

fn ids(features: &[Feature]) -> Vec<&str> {
    features.iter().map(|f| f.id.as_str()).collect()
}

#[tokio::test]
async fn test_concurrent_widgets_share_one_execution() {
    let portal = Portal::new();
    let first = portal.dispatcher();
    let second = portal.dispatcher();

    let (a, b) = tokio::join!(
        first.get_unique_values("district", UniqueValueFlags::default()),
        second.get_unique_values("district", UniqueValueFlags::default()),
    );

    assert_eq!(a.unwrap(), vec![json!("A"), json!("B")]);
    assert_eq!(b.unwrap(), vec![json!("A"), json!("B")]);

    let stats = portal.coordinator.stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.executions, 1);
    assert_eq!(stats.coalesced_requests, 1);

    // A later widget is served from the cache
    let third = portal.dispatcher();
    third
        .get_unique_values("district", UniqueValueFlags::default())
        .await
        .unwrap();
    let stats = portal.coordinator.stats();
    assert_eq!(stats.cache_hits, 1);
    assert_eq!(stats.executions, 1);
}

#[tokio::test]
async fn test_describe_range_and_filter() {
    let portal = Portal::new();
    let dispatcher = portal.dispatcher();

    let attributes = dispatcher.describe_attributes().await.unwrap();
    let area = attributes.iter().find(|a| a.name == "area").unwrap();
    assert_eq!(area.data_type, AttributeType::Integer);

    let range = dispatcher
        .get_value_range("area", RangeFlags::default())
        .await
        .unwrap();
    assert_eq!(range.min, Some(json!(45)));
    assert_eq!(range.max, Some(json!(120)));

    let query = FilterQuery::new(vec![
        FilterRule::equals("district", "A"),
        FilterRule::equals("area", 100).with_operator(Operator::Lt),
    ]);
    let features = dispatcher.run_filter_query(query).await.unwrap();
    assert_eq!(ids(&features), vec!["p3"]);
}

#[tokio::test]
async fn test_visible_extent_is_part_of_the_question() {
    let portal = Portal::new();
    let dispatcher = portal.dispatcher();
    let query = FilterQuery::new(vec![FilterRule::any_of("district", ["A", "B"])]).in_extent();

    // Without a laid-out map nothing is restricted
    let all = dispatcher.run_filter_query(query.clone()).await.unwrap();
    assert_eq!(all.len(), 3);

    portal.map.set_extent(Some(Extent::new(0.0, 0.0, 10.0, 10.0)));
    let visible = dispatcher.run_filter_query(query.clone()).await.unwrap();
    assert_eq!(ids(&visible), vec!["p1", "p3"]);

    portal.map.set_extent(Some(Extent::new(30.0, 30.0, 50.0, 50.0)));
    let moved = dispatcher.run_filter_query(query).await.unwrap();
    assert_eq!(ids(&moved), vec!["p2"]);

    assert_eq!(portal.coordinator.stats().executions, 3);
}

#[tokio::test]
async fn test_callback_dispatch_fans_out() {
    let portal = Portal::new();
    let dispatcher = portal.dispatcher();
    let results = Arc::new(Mutex::new(Vec::new()));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let mut dispatches = Vec::new();
    for _ in 0..3 {
        let results = Arc::clone(&results);
        let tx = tx.clone();
        let dispatch = dispatcher.dispatch(
            Operation::DescribeAttributes,
            move |output| {
                if let QueryOutput::Attributes(attributes) = &*output {
                    results.lock().unwrap().push(attributes.len());
                }
                tx.send(()).unwrap();
            },
            |e| panic!("unexpected error: {}", e),
        );
        dispatches.push(dispatch);
    }

    for _ in 0..3 {
        rx.recv().await.unwrap();
    }

    assert_eq!(
        dispatches,
        vec![
            Some(Dispatch::Started),
            Some(Dispatch::Coalesced),
            Some(Dispatch::Coalesced)
        ]
    );
    assert_eq!(*results.lock().unwrap(), vec![2, 2, 2]);
}

#[tokio::test]
async fn test_external_evaluation_needs_a_feature_service() {
    let portal = Portal::new();
    let map: Arc<dyn MapView> = portal.map.clone();
    let dispatcher = QueryDispatcher::new(
        Arc::clone(&portal.coordinator),
        Arc::clone(&portal.registry),
        map,
    );

    let err = dispatcher
        .bind_service("parcels", &LayerMetadata::new("GeoJSON"), true)
        .unwrap_err();
    assert_eq!(
        err,
        FilterError::UnsupportedOperation {
            kind: ServiceKind::StaticFeatureService,
            external: true,
        }
    );
    assert!(dispatcher.service().is_none());

    let err = dispatcher.describe_attributes().await.unwrap_err();
    assert!(err.is_no_service());
}

#[tokio::test]
async fn test_custom_registry() {
    let layers = Arc::new(MemoryLayerSource::new());
    layers.set_features("parcels", parcels());
    let source: Arc<dyn LayerSource> = layers;

    let mut registry = InterfaceRegistry::empty();
    registry.register(Arc::new(InMemoryInterface::new(
        ServiceKind::StaticFeatureService,
        source,
        1,
    )));
    let map: Arc<dyn MapView> = Arc::new(StaticMapView::new("EPSG:4326"));
    let dispatcher = QueryDispatcher::new(
        Arc::new(QueryCoordinator::new()),
        Arc::new(registry),
        map,
    );

    dispatcher
        .bind_service("parcels", &LayerMetadata::new("GeoJSON"), false)
        .unwrap();
    let values = dispatcher
        .get_unique_values("area", UniqueValueFlags::default())
        .await
        .unwrap();
    assert_eq!(values, vec![json!(45), json!(80), json!(120)]);

    // Kinds without a registered interface are a wiring error
    dispatcher
        .bind_service("parcels", &LayerMetadata::new("SensorThings"), false)
        .unwrap();
    let err = dispatcher.describe_attributes().await.unwrap_err();
    assert!(matches!(err, FilterError::ConnectorContract(_)));
}

#[tokio::test(start_paused = true)]
async fn test_interval_refresh_clears_cache() {
    let portal = Portal::new();
    let dispatcher = portal.dispatcher();
    let register = IntervalRegister::new();
    let refreshes = Arc::new(AtomicUsize::new(0));

    let coordinator = Arc::clone(&portal.coordinator);
    let counter = Arc::clone(&refreshes);
    register.register("refresh-parcels", Duration::from_secs(60), move || {
        coordinator.clear_cache();
        counter.fetch_add(1, Ordering::SeqCst);
    });

    dispatcher.describe_attributes().await.unwrap();
    assert_eq!(portal.coordinator.cache_len(), 1);

    // Newly loaded features are only seen once the cache is dropped
    portal.layers.set_features(
        "parcels",
        vec![Feature::new("p9").with_property("owner", "city")],
    );

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    assert_eq!(portal.coordinator.cache_len(), 0);

    let attributes = dispatcher.describe_attributes().await.unwrap();
    assert_eq!(attributes.len(), 1);
    assert_eq!(attributes[0].name, "owner");

    register.shutdown();
}
