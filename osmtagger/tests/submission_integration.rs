//! Integration tests for changeset submission.
//!
//! These tests drive the real reqwest transport against a local mock API
//! server and verify the full open → upload → close flow, including what
//! stays staged when a step fails.
//!
//! Run with: `cargo test --test submission_integration`

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use osmtagger::coord::GeoPoint;
use osmtagger::osm::{
    AuthError, Authenticator, FileTokenStore, LoginPrompt, MemoryTokenStore, OAuthConfig, OsmApi,
    ReqwestTransport, TokenStore, TOKEN_FILE,
};
use osmtagger::preset::TagMap;
use osmtagger::staging::{EditStagingStore, StagedObject};
use osmtagger::sync::{SubmissionPhase, SyncClient, SyncError};

// ============================================================================
// Helper Functions
// ============================================================================

const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> SyncClient<ReqwestTransport> {
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    let api = OsmApi::new(transport.clone(), server.uri());
    let auth = Authenticator::new(
        transport,
        OAuthConfig::new(server.uri(), "client"),
        server.uri(),
        Arc::new(MemoryTokenStore::with_token(&server.uri(), TOKEN)),
    );
    SyncClient::new(api, auth)
}

fn tags(pairs: &[(&str, &str)]) -> TagMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A store holding one new bakery node with id -1.
fn bakery_store(dir: &TempDir) -> EditStagingStore {
    let store = EditStagingStore::open(dir.path());
    let id = store.allocate_local_id();
    assert_eq!(id, -1);
    store.stage(
        StagedObject::new_node(id, GeoPoint::new(51.5, -0.1)),
        tags(&[("shop", "bakery")]),
    );
    store
}

async fn mount_open(server: &MockServer, id: &str) {
    Mock::given(method("PUT"))
        .and(path("/api/0.6/changeset/create"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(id))
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A staged bakery is uploaded in changeset 42 and leaves the store.
#[tokio::test]
async fn test_submit_new_node() {
    let server = MockServer::start().await;
    mount_open(&server, "42").await;
    Mock::given(method("POST"))
        .and(path("/api/0.6/changeset/42/upload"))
        .and(body_string_contains(r#"changeset="42""#))
        .and(body_string_contains(r#"id="-1""#))
        .and(body_string_contains(r#"v="bakery""#))
        .respond_with(ResponseTemplate::new(200).set_body_string("<diffResult/>"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/0.6/changeset/42/close"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = bakery_store(&dir);
    let client = client(&server);

    let report = client.submit(&store, Some("Add bakery")).await.unwrap();
    assert_eq!(report.changeset_id, 42);
    assert_eq!(report.created, 1);
    assert!(report.closed);
    assert!(store.get_saved(-1).is_none());
    assert!(!client.is_busy());
    assert_eq!(*client.phase().borrow(), SubmissionPhase::Idle);

    // The removal reached disk too
    assert!(EditStagingStore::open(dir.path()).is_empty());
}

/// A rejected upload keeps the edit staged and still closes the changeset.
#[tokio::test]
async fn test_upload_failure_keeps_staged_edit() {
    let server = MockServer::start().await;
    mount_open(&server, "43").await;
    Mock::given(method("POST"))
        .and(path("/api/0.6/changeset/43/upload"))
        .respond_with(ResponseTemplate::new(409).set_body_string("Version mismatch"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/0.6/changeset/43/close"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = bakery_store(&dir);

    let err = client(&server).submit(&store, None).await.unwrap_err();
    assert!(matches!(err, SyncError::Upload { changeset_id: 43, .. }));
    assert!(err.to_string().contains("43"));
    assert!(store.get_saved(-1).is_some());
}

/// An edit staged again while the upload is in flight stays pending.
#[tokio::test]
async fn test_restage_during_upload_is_kept() {
    let server = MockServer::start().await;
    mount_open(&server, "44").await;
    Mock::given(method("POST"))
        .and(path("/api/0.6/changeset/44/upload"))
        .and(body_string_contains(r#"v="1""#))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<diffResult/>")
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/0.6/changeset/44/close"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = EditStagingStore::open(dir.path());
    let mut bench = StagedObject::new_node(5, GeoPoint::new(51.5, -0.1));
    bench.version = 2;
    bench.tags = tags(&[("amenity", "bench")]);
    bench.baseline = bench.tags.clone();
    store.stage(bench.clone(), tags(&[("amenity", "bench"), ("seats", "1")]));

    let client = client(&server);
    let (report, _) = tokio::join!(client.submit(&store, None), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.stage(bench.clone(), tags(&[("amenity", "bench"), ("seats", "2")]));
    });

    assert_eq!(report.unwrap().modified, 1);
    let pending = store.get_saved(5).expect("newer edit kept");
    assert_eq!(pending.tags["seats"], "2");
    assert_eq!(
        EditStagingStore::open(dir.path()).get_saved(5).unwrap().tags["seats"],
        "2"
    );
}

/// Conflicting staging is refused before anything is sent.
#[tokio::test]
async fn test_conflict_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let store = EditStagingStore::open(dir.path());
    let mut object = StagedObject::new_node(100, GeoPoint::new(0.0, 0.0));
    object.version = 3;
    store.stage(object.clone(), tags(&[("amenity", "bench")]));
    store.mark_deleted(object);

    let err = client(&server).submit(&store, None).await.unwrap_err();
    assert!(matches!(err, SyncError::StagingConflict { ref ids } if ids == &vec![100]));
}

// ============================================================================
// Login
// ============================================================================

struct PastedRedirect;

impl LoginPrompt for PastedRedirect {
    fn authorize(&self, authorize_url: &str) -> Result<String, AuthError> {
        assert!(authorize_url.contains("response_type=code"));
        Ok("osmtagger:/?code=granted".to_string())
    }
}

/// With no stored token, submission logs in first and keeps the token.
#[tokio::test]
async fn test_login_before_submit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("code=granted"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"{{"access_token":"{}","token_type":"Bearer","scope":"read_prefs write_api","created_at":1700000000}}"#,
            TOKEN
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_open(&server, "44").await;
    Mock::given(method("POST"))
        .and(path("/api/0.6/changeset/44/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<diffResult/>"))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/0.6/changeset/44/close"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let tokens = Arc::new(FileTokenStore::new(dir.path().join(TOKEN_FILE)));
    let transport = Arc::new(ReqwestTransport::new().unwrap());
    let auth = Authenticator::new(
        transport.clone(),
        OAuthConfig::new(server.uri(), "client"),
        server.uri(),
        tokens.clone(),
    )
    .with_prompt(Arc::new(PastedRedirect));
    let client = SyncClient::new(OsmApi::new(transport, server.uri()), auth);

    let store = bakery_store(&dir);
    client.submit(&store, None).await.unwrap();

    let reloaded = FileTokenStore::new(dir.path().join(TOKEN_FILE));
    assert_eq!(reloaded.load(&server.uri()).as_deref(), Some(TOKEN));
}
