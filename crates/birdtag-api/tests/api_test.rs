//! API tests over in-memory collaborators: upload-to-done flow,
//! subscriptions, search and error shapes.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use birdtag_api::routes::build_router;
use birdtag_api::state::AppState;
use birdtag_core::{Config, MediaStatus, StorageBackend};
use birdtag_db::MediaStore;
use birdtag_engines::test_helpers::MockEngine;
use birdtag_engines::{Analyzer, Detection};
use birdtag_notify::test_helpers::{MemoryChannelService, MemorySubscriptionStore};
use birdtag_notify::{NotificationFanout, SubscriptionRegistry};
use birdtag_pipeline::test_helpers::{MemoryMediaStore, MemoryObjectStore};
use birdtag_pipeline::{PipelineWorker, TaggingPipeline, WorkerConfig};

fn test_config() -> Config {
    Config {
        server_port: 0,
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        environment: "test".to_string(),
        storage_backend: StorageBackend::Local,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        local_storage_path: Some("/tmp/unused".to_string()),
        local_storage_base_url: None,
        model_server_url: "http://localhost:9090".to_string(),
        engine_timeout_seconds: 5,
        confidence_threshold: 0.5,
        audio_min_confidence: 0.1,
        sns_region: None,
        max_upload_size_bytes: 10 * 1024 * 1024,
        worker_max_workers: 2,
        worker_queue_capacity: 16,
    }
}

struct TestApp {
    router: Router,
    media: Arc<MemoryMediaStore>,
    channels: Arc<MemoryChannelService>,
}

fn build_app(engine: MockEngine) -> TestApp {
    let media = Arc::new(MemoryMediaStore::new());
    let storage = Arc::new(MemoryObjectStore::new());
    let channels = Arc::new(MemoryChannelService::new());
    let registry = SubscriptionRegistry::new(
        Arc::new(MemorySubscriptionStore::new()),
        channels.clone(),
    );

    let pipeline = Arc::new(TaggingPipeline::new(
        media.clone(),
        storage.clone(),
        Analyzer::new(Arc::new(engine), 0.5, 0.1),
        NotificationFanout::new(registry.clone(), channels.clone()),
        None,
    ));
    let worker = PipelineWorker::new(
        pipeline,
        WorkerConfig {
            max_workers: 2,
            queue_capacity: 16,
        },
    );

    let state = Arc::new(AppState {
        config: test_config(),
        media: media.clone(),
        storage,
        registry,
        worker,
    });

    TestApp {
        router: build_router(state),
        media,
        channels,
    }
}

async fn send_json(router: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn upload_creates_record_and_pipeline_completes_it() {
    let engine = MockEngine::default().with_image_rows(vec![Detection {
        label: "Sparrow".to_string(),
        confidence: 0.9,
    }]);
    let app = build_app(engine);

    let body = json!({
        "files": [{
            "fileName": "birds.jpg",
            "mimeType": "image/jpeg",
            "base64Data": STANDARD.encode(b"fake-jpeg-bytes"),
        }]
    });
    let (status, response) = send_json(&app.router, "POST", "/api/v1/upload", body).await;

    assert_eq!(status, StatusCode::OK);
    let uploaded = response["uploaded"].as_array().unwrap();
    assert_eq!(uploaded.len(), 1);
    let file_id: Uuid = uploaded[0]["file_id"].as_str().unwrap().parse().unwrap();

    // The worker picks the event up asynchronously.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let record = app.media.snapshot(file_id).unwrap();
        if record.status == MediaStatus::Done {
            assert_eq!(record.tags.get("sparrow"), Some(&1));
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "pipeline did not finish");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn upload_with_invalid_base64_is_rejected_before_any_mutation() {
    let app = build_app(MockEngine::default());

    let body = json!({
        "files": [{
            "fileName": "birds.jpg",
            "mimeType": "image/jpeg",
            "base64Data": "!!! not base64 !!!",
        }]
    });
    let (status, response) = send_json(&app.router, "POST", "/api/v1/upload", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn subscribe_settings_unsubscribe_roundtrip() {
    let app = build_app(MockEngine::default());

    let body = json!({ "email": "alice@example.com", "species": "Sparrow" });
    let (status, response) =
        send_json(&app.router, "POST", "/api/v1/subscriptions", body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["subscription_id"], "alice@example.com#sparrow");
    assert_eq!(
        app.channels.endpoints("notifications-sparrow"),
        vec!["alice@example.com".to_string()]
    );

    let (status, response) = get_json(
        &app.router,
        "/api/v1/subscriptions/settings?email=alice@example.com",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total_subscriptions"], 1);
    assert_eq!(response["settings"][0]["tag"], "sparrow");

    let (status, response) =
        send_json(&app.router, "DELETE", "/api/v1/subscriptions", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["removed"], true);
    assert!(app.channels.endpoints("notifications-sparrow").is_empty());
}

#[tokio::test]
async fn subscribe_without_species_is_a_validation_error() {
    let app = build_app(MockEngine::default());

    let body = json!({ "email": "alice@example.com", "species": "  " });
    let (status, response) = send_json(&app.router, "POST", "/api/v1/subscriptions", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn settings_require_an_email() {
    let app = build_app(MockEngine::default());
    let (status, _) = get_json(&app.router, "/api/v1/subscriptions/settings").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_requires_at_least_one_tag() {
    let app = build_app(MockEngine::default());
    let (status, response) = get_json(&app.router, "/api/v1/media/search?count1=2").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn search_filters_by_minimum_counts() {
    let app = build_app(MockEngine::default());

    // Seed one completed record directly in the store.
    let record = birdtag_core::MediaRecord::pending(
        Uuid::new_v4(),
        "uploads/images/x.jpg".to_string(),
        "memory://uploads/images/x.jpg".to_string(),
        "x.jpg".to_string(),
        "image/jpeg".to_string(),
    );
    app.media.create_pending(&record).await.unwrap();
    app.media
        .mark_processing(record.file_id, birdtag_core::MediaKind::Image)
        .await
        .unwrap();
    let mut tags = birdtag_core::TagMap::new();
    tags.insert("sparrow".to_string(), 3);
    app.media.complete(record.file_id, &tags).await.unwrap();

    let (status, response) =
        get_json(&app.router, "/api/v1/media/search?tag1=Sparrow&count1=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total"], 1);

    let (status, response) =
        get_json(&app.router, "/api/v1/media/search?tag1=sparrow&count1=4").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["total"], 0);
}

#[tokio::test]
async fn unknown_media_id_is_404() {
    let app = build_app(MockEngine::default());
    let (status, response) =
        get_json(&app.router, &format!("/api/v1/media/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["code"], "NOT_FOUND");
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = build_app(MockEngine::default());
    let (status, response) = get_json(&app.router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "ok");
}
