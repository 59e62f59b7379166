//! Integration tests for area downloads.
//!
//! Covers shrink-and-retry on area-too-large answers, viewport persistence
//! and out-of-order responses, against a local mock API server.
//!
//! Run with: `cargo test --test area_download_integration`

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use osmtagger::coord::{BoundingBox, GeoPoint};
use osmtagger::osm::{ObjectType, OsmApi, ReqwestTransport};
use osmtagger::remote::{
    AreaDownloader, DownloadConfig, DownloadError, DownloadOutcome, RemoteDataIndex,
    ViewportStore,
};

// ============================================================================
// Helper Functions
// ============================================================================

const CAFE_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <node id="1" lat="0.0001" lon="0.0001" version="2" changeset="5">
    <tag k="amenity" v="cafe"/>
  </node>
</osm>"#;

const BENCH_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6" generator="test">
  <node id="2" lat="1.0001" lon="1.0001" version="1" changeset="6">
    <tag k="amenity" v="bench"/>
  </node>
</osm>"#;

fn downloader(server: &MockServer, dir: &TempDir) -> AreaDownloader<ReqwestTransport> {
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    AreaDownloader::new(
        OsmApi::new(transport, server.uri()),
        Arc::new(RemoteDataIndex::new()),
        ViewportStore::new(dir.path()),
        DownloadConfig::default(),
    )
}

fn bbox_query(center: GeoPoint, half_extent: f64) -> String {
    BoundingBox::around(center, half_extent).unwrap().to_query()
}

// ============================================================================
// Integration Tests
// ============================================================================

/// An area-too-large answer is retried with the box at 75% extent.
#[tokio::test]
async fn test_area_too_large_retries_smaller_box() {
    let server = MockServer::start().await;
    let center = GeoPoint::new(0.0, 0.0);

    Mock::given(method("GET"))
        .and(path("/api/0.6/map"))
        .and(query_param("bbox", bbox_query(center, 0.0045).as_str()))
        .respond_with(ResponseTemplate::new(400).set_body_string("You requested too many nodes"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/0.6/map"))
        .and(query_param("bbox", bbox_query(center, 0.0045 * 0.75).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(CAFE_MAP))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let downloader = downloader(&server, &dir);
    let outcome = downloader.download(center).await.unwrap();

    assert!(matches!(outcome, DownloadOutcome::Loaded { features: 1, .. }));
    assert!((downloader.half_extent() - 0.0045 * 0.75).abs() < 1e-12);
    assert!(downloader.index().node(1).is_some());
}

/// A successful download is remembered across restarts.
#[tokio::test]
async fn test_viewport_is_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/0.6/map"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CAFE_MAP))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let center = GeoPoint::new(0.0, 0.0);
    downloader(&server, &dir).download(center).await.unwrap();

    let restarted = downloader(&server, &dir);
    let saved = restarted.saved_viewport().unwrap();
    assert!(saved.contains(&center));
    assert!(restarted.needs_download(&center));
}

/// A slow response for an old viewport never replaces a newer one.
#[tokio::test]
async fn test_stale_response_is_discarded() {
    let server = MockServer::start().await;
    let old_center = GeoPoint::new(0.0, 0.0);
    let new_center = GeoPoint::new(1.0, 1.0);

    Mock::given(method("GET"))
        .and(query_param("bbox", bbox_query(old_center, 0.0045).as_str()))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(CAFE_MAP)
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("bbox", bbox_query(new_center, 0.0045).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(BENCH_MAP))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let downloader = Arc::new(downloader(&server, &dir));

    let slow = {
        let downloader = Arc::clone(&downloader);
        tokio::spawn(async move { downloader.download(old_center).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fast = downloader.download(new_center).await.unwrap();
    let slow = slow.await.unwrap().unwrap();

    assert!(matches!(fast, DownloadOutcome::Loaded { generation: 2, .. }));
    assert_eq!(slow, DownloadOutcome::Stale { generation: 1 });

    let index = downloader.index();
    assert!(index.node(1).is_none());
    assert!(index.node(2).is_some());
    let hits = index.resolve_tap(GeoPoint::new(1.0001, 1.0001), 0.001, &[]);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].object_type, ObjectType::Node);
}

/// Server failures other than area-too-large are returned unchanged.
#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let err = downloader(&server, &dir)
        .download(GeoPoint::new(0.0, 0.0))
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::Osm(_)));
    assert!(err.to_string().contains("maintenance"));
}
