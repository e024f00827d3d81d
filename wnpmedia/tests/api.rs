use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use wnpmedia::{MediaApiExt, MediaApiState, SnapshotStore};
use wnpserver::ServerBuilder;
use wnpsource::testing::ScriptedSource;
use wnpsource::{MediaCommand, MediaInfo, PlaybackState};

struct Harness {
    router: Router,
    store: SnapshotStore,
    source: Arc<ScriptedSource>,
}

async fn harness_with_dashboard(dashboard: PathBuf) -> Harness {
    let store = SnapshotStore::new();
    let source = Arc::new(ScriptedSource::new());
    let state = MediaApiState::new(store.clone(), source.clone(), dashboard);

    let mut server = ServerBuilder::new("test").cors(true).build();
    server.init_media_api(state).await.unwrap();

    Harness {
        router: server.router().await,
        store,
        source,
    }
}

async fn harness() -> Harness {
    harness_with_dashboard(PathBuf::from("/nonexistent/media-dashboard.html")).await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(router, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_control(router: &Router, body: &str) -> (StatusCode, Value) {
    let request = Request::post("/api/media/control")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn song_a() -> MediaInfo {
    MediaInfo {
        title: "Song A".into(),
        artist: "Band B".into(),
        state: Some(PlaybackState::Playing),
        duration_seconds: 200.0,
        position_seconds: 50.0,
        volume: Some(80),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_detect_and_status_without_media() {
    let h = harness().await;

    for uri in ["/api/media/detect", "/api/media/status"] {
        let (status, body) = get_json(&h.router, uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"success": false, "error": "No media detected", "data": null})
        );
    }
}

#[tokio::test]
async fn test_detect_returns_current_song() {
    let h = harness().await;
    h.store.update(&song_a());

    let (status, body) = get_json(&h.router, "/api/media/detect").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("error").is_none());

    let data = &body["data"];
    assert_eq!(data["title"], "Song A");
    assert_eq!(data["artist"], "Band B");
    assert_eq!(data["playbackState"], "playing");
    assert_eq!(data["isPlaying"], true);
    assert_eq!(data["duration"], 200.0);
    assert_eq!(data["position"], 50.0);
    assert_eq!(data["volume"], 80);
    assert_eq!(data["source"], "WebNowPlaying");
    assert_eq!(data["supportsControl"], true);
    assert_eq!(data["url"], Value::Null);

    // status est un alias strict de detect
    let (_, alias) = get_json(&h.router, "/api/media/status").await;
    assert_eq!(alias, body);
}

#[tokio::test]
async fn test_paused_and_stopped_map_to_paused() {
    let h = harness().await;

    for state in [PlaybackState::Paused, PlaybackState::Stopped] {
        h.store.update(&MediaInfo {
            state: Some(state),
            ..song_a()
        });
        let (_, body) = get_json(&h.router, "/api/media/detect").await;
        assert_eq!(body["data"]["isPlaying"], false);
        assert_eq!(body["data"]["playbackState"], "paused");
    }
}

#[tokio::test]
async fn test_control_pause_invokes_adapter_once() {
    let h = harness().await;

    let (status, body) = post_control(&h.router, r#"{"action":"pause"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().unwrap().ends_with("pause"));
    assert_eq!(h.source.commands(), vec![MediaCommand::Pause]);
}

#[tokio::test]
async fn test_control_dispatches_every_action() {
    let h = harness().await;

    for body in [
        r#"{"action":"play"}"#,
        r#"{"action":"toggle"}"#,
        r#"{"action":"next"}"#,
        r#"{"action":"previous"}"#,
        r#"{"action":"seek","position":42.5}"#,
        r#"{"action":"volume","volume":15}"#,
    ] {
        let (status, _) = post_control(&h.router, body).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
    }

    assert_eq!(
        h.source.commands(),
        vec![
            MediaCommand::Play,
            MediaCommand::Toggle,
            MediaCommand::Next,
            MediaCommand::Previous,
            MediaCommand::Seek(42.5),
            MediaCommand::Volume(15),
        ]
    );
}

#[tokio::test]
async fn test_control_defaults_for_seek_and_volume() {
    let h = harness().await;

    post_control(&h.router, r#"{"action":"seek"}"#).await;
    post_control(&h.router, r#"{"action":"volume"}"#).await;

    assert_eq!(
        h.source.commands(),
        vec![MediaCommand::Seek(0.0), MediaCommand::Volume(50)]
    );
}

#[tokio::test]
async fn test_control_ignores_arguments_of_other_actions() {
    let h = harness().await;

    let (status, body) = post_control(&h.router, r#"{"action":"pause","volume":"loud"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = post_control(&h.router, r#"{"action":"next","position":"x"}"#).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        h.source.commands(),
        vec![MediaCommand::Pause, MediaCommand::Next]
    );
}

#[tokio::test]
async fn test_control_unknown_action_is_bad_request() {
    let h = harness().await;

    let (status, body) = post_control(&h.router, r#"{"action":"shuffle"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"success": false, "error": "Unknown action: shuffle"}));
    assert!(h.source.commands().is_empty());
}

#[tokio::test]
async fn test_control_malformed_body_is_internal_error() {
    let h = harness().await;

    let (status, body) = post_control(&h.router, "not json").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_control_adapter_failure_is_internal_error() {
    let h = harness().await;
    h.source.fail_commands(Some("extension unreachable"));

    let (status, body) = post_control(&h.router, r#"{"action":"next"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "error": "Command 'next' failed: extension unreachable"})
    );
}

#[tokio::test]
async fn test_control_does_not_touch_snapshot() {
    let h = harness().await;
    h.store.update(&song_a());
    let before = h.store.read();

    post_control(&h.router, r#"{"action":"pause"}"#).await;

    // L'effet n'est visible qu'au prochain relevé
    assert_eq!(*h.store.read(), *before);
    let (_, body) = get_json(&h.router, "/api/media/detect").await;
    assert_eq!(body["data"]["isPlaying"], true);
}

#[tokio::test]
async fn test_health_reports_media_presence() {
    let h = harness().await;

    let (status, body) = get_json(&h.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["hasMedia"], false);
    assert_eq!(body["adapter"], "scripted");
    assert!(
        chrono::DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok()
    );

    h.store.update(&song_a());
    let (status, body) = get_json(&h.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasMedia"], true);
}

#[tokio::test]
async fn test_health_surfaces_poll_failures() {
    let h = harness().await;
    h.source.set_media(song_a());
    h.store.refresh_from(h.source.as_ref()).unwrap();

    h.source.fail_reads(Some("disconnected"));
    assert!(h.store.refresh_from(h.source.as_ref()).is_err());

    let (status, body) = get_json(&h.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["hasMedia"], true);
    assert_eq!(body["lastPoll"]["ok"], false);
    assert_eq!(body["lastPoll"]["consecutiveFailures"], 1);
    assert_eq!(
        body["lastPoll"]["error"],
        "Cannot read media state: disconnected"
    );
}

#[tokio::test]
async fn test_dashboard_missing_is_plain_404() {
    let h = harness().await;

    let (status, body) = send(&h.router, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(String::from_utf8(body.clone()).unwrap(), "Dashboard not found");
    assert!(serde_json::from_slice::<Value>(&body).is_err());
}

#[tokio::test]
async fn test_dashboard_is_served_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("media-dashboard.html");
    std::fs::write(&path, "<html><body>now playing</body></html>").unwrap();

    let h = harness_with_dashboard(path.clone()).await;
    let response = h
        .router
        .clone()
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    // Le fichier est relu à chaque requête
    std::fs::remove_file(&path).unwrap();
    let (status, _) = send(&h.router, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_lists_media_routes() {
    let h = harness().await;

    let (status, body) = get_json(&h.router, "/api-docs/media.json").await;
    assert_eq!(status, StatusCode::OK);
    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/media/detect"));
    assert!(paths.contains_key("/api/media/control"));
}

#[tokio::test]
async fn test_cors_preflight_for_control() {
    let h = harness().await;

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/media/control")
        .header(header::ORIGIN, "http://dashboard.local")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
        .body(Body::empty())
        .unwrap();
    let response = h.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
