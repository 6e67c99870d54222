//! End-to-end pipeline tests over in-memory collaborators: dispatch,
//! analysis, the status machine, and notification fan-out.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use birdtag_core::{MediaKind, MediaRecord, MediaStatus, PipelineError, TagMap};
use birdtag_db::MediaStore;
use birdtag_engines::test_helpers::MockEngine;
use birdtag_engines::{Analyzer, Detection, FrameDetection, SegmentDetection, VideoInference};
use birdtag_notify::test_helpers::{MemoryChannelService, MemorySubscriptionStore};
use birdtag_notify::{NotificationFanout, SubscriptionRegistry};
use birdtag_storage::ObjectStore;
use birdtag_pipeline::test_helpers::{MemoryMediaStore, MemoryObjectStore};
use birdtag_pipeline::{ObjectEvent, PipelineWorker, ProcessOutcome, TaggingPipeline, WorkerConfig};

struct Harness {
    media: Arc<MemoryMediaStore>,
    storage: Arc<MemoryObjectStore>,
    channels: Arc<MemoryChannelService>,
    registry: SubscriptionRegistry,
}

impl Harness {
    fn new() -> Self {
        let media = Arc::new(MemoryMediaStore::new());
        let storage = Arc::new(MemoryObjectStore::new());
        let channels = Arc::new(MemoryChannelService::new());
        let registry = SubscriptionRegistry::new(
            Arc::new(MemorySubscriptionStore::new()),
            channels.clone(),
        );
        Self {
            media,
            storage,
            channels,
            registry,
        }
    }

    fn pipeline(&self, engine: MockEngine) -> TaggingPipeline {
        TaggingPipeline::new(
            self.media.clone(),
            self.storage.clone(),
            Analyzer::new(Arc::new(engine), 0.5, 0.1),
            NotificationFanout::new(self.registry.clone(), self.channels.clone()),
            None,
        )
    }

    /// Seed a pending record plus its stored object; returns the event.
    async fn seed(&self, key: &str) -> ObjectEvent {
        let file_id = Uuid::new_v4();
        let record = MediaRecord::pending(
            file_id,
            key.to_string(),
            format!("memory://{}", key),
            key.rsplit('/').next().unwrap_or(key).to_string(),
            "application/octet-stream".to_string(),
        );
        self.media.create_pending(&record).await.unwrap();
        self.storage
            .upload(key, "application/octet-stream", b"content".to_vec())
            .await
            .unwrap();
        ObjectEvent {
            file_id,
            object_key: key.to_string(),
        }
    }
}

fn detection(label: &str, confidence: f32) -> Detection {
    Detection {
        label: label.to_string(),
        confidence,
    }
}

#[tokio::test]
async fn image_event_completes_and_notifies_subscribers() {
    let harness = Harness::new();
    harness
        .registry
        .subscribe("alice@example.com", "Sparrow")
        .await
        .unwrap();

    let engine = MockEngine::default().with_image_rows(vec![
        detection("Sparrow", 0.9),
        detection("Sparrow", 0.8),
        detection("Hawk", 0.7),
    ]);
    let pipeline = harness.pipeline(engine);

    let event = harness.seed("uploads/images/2026-08-07/a_birds.jpg").await;
    let outcome = pipeline.process(&event).await.unwrap();

    let ProcessOutcome::Completed { record, fanout } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(record.status, MediaStatus::Done);
    assert_eq!(record.file_type, Some(MediaKind::Image));
    assert_eq!(record.tags.get("sparrow"), Some(&2));
    assert_eq!(record.tags.get("hawk"), Some(&1));

    // One notification for sparrow (alice), none for hawk (no subscribers).
    assert_eq!(fanout.published, vec!["sparrow".to_string()]);
    assert_eq!(fanout.skipped, vec!["hawk".to_string()]);
    let published = harness.channels.published("notifications-sparrow");
    assert_eq!(published.len(), 1);
    assert!(published[0].0.contains("image"));
    assert!(harness.channels.published("notifications-hawk").is_empty());
}

#[tokio::test]
async fn unsupported_extension_is_a_noop() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(MockEngine::default());

    let event = harness.seed("uploads/other/notes.txt").await;
    let outcome = pipeline.process(&event).await.unwrap();

    assert!(matches!(outcome, ProcessOutcome::Skipped));
    // Record untouched: still pending, unclassified, no tags.
    let record = harness.media.snapshot(event.file_id).unwrap();
    assert_eq!(record.status, MediaStatus::Pending);
    assert!(record.file_type.is_none());
    assert!(record.tags.is_empty());
}

#[tokio::test]
async fn engine_error_routes_record_to_error_status() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(MockEngine::default().failing_with_engine("model crashed"));

    let event = harness.seed("clips/song.wav").await;
    let outcome = pipeline.process(&event).await.unwrap();

    let ProcessOutcome::Failed(err) = outcome else {
        panic!("expected failure");
    };
    assert!(matches!(err, PipelineError::Engine(_)));

    let record = harness.media.snapshot(event.file_id).unwrap();
    assert_eq!(record.status, MediaStatus::Error);
    // Tags are exactly as they were before the attempt.
    assert!(record.tags.is_empty());
}

#[tokio::test]
async fn decode_error_also_fails_the_record() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(MockEngine::default().failing_with_decode("bad codec"));

    let event = harness.seed("videos/corrupt.mp4").await;
    let outcome = pipeline.process(&event).await.unwrap();

    assert!(matches!(
        outcome,
        ProcessOutcome::Failed(PipelineError::Decode(_))
    ));
    let record = harness.media.snapshot(event.file_id).unwrap();
    assert_eq!(record.status, MediaStatus::Error);
}

#[tokio::test]
async fn reprocessing_replaces_tags_never_accumulates() {
    let harness = Harness::new();
    let event = harness.seed("uploads/images/a.png").await;

    let first = harness.pipeline(
        MockEngine::default()
            .with_image_rows(vec![detection("Sparrow", 0.9), detection("Sparrow", 0.9)]),
    );
    first.process(&event).await.unwrap();
    assert_eq!(
        harness.media.snapshot(event.file_id).unwrap().tags.get("sparrow"),
        Some(&2)
    );

    // A retried trigger runs the whole attempt again with fresh engine
    // output; counts must replace the previous map, not stack onto it.
    let second = harness.pipeline(MockEngine::default().with_image_rows(vec![
        detection("Sparrow", 0.9),
        detection("Sparrow", 0.9),
        detection("Sparrow", 0.9),
        detection("Sparrow", 0.9),
        detection("Sparrow", 0.9),
    ]));
    second.process(&event).await.unwrap();

    let record = harness.media.snapshot(event.file_id).unwrap();
    assert_eq!(record.tags.get("sparrow"), Some(&5));
    assert_eq!(record.status, MediaStatus::Done);
}

#[tokio::test]
async fn video_aggregation_uses_max_per_frame_end_to_end() {
    let harness = Harness::new();
    let frame = |frame_index, label: &str| FrameDetection {
        frame_index,
        label: label.to_string(),
        confidence: 0.9,
    };
    let engine = MockEngine::default().with_video(VideoInference {
        frames_scanned: 3,
        detections: vec![
            frame(0, "A"),
            frame(0, "A"),
            frame(1, "A"),
            frame(1, "B"),
            frame(2, "A"),
            frame(2, "A"),
            frame(2, "A"),
        ],
    });
    let pipeline = harness.pipeline(engine);

    let event = harness.seed("videos/flock.mp4").await;
    pipeline.process(&event).await.unwrap();

    let record = harness.media.snapshot(event.file_id).unwrap();
    assert_eq!(record.file_type, Some(MediaKind::Video));
    assert_eq!(record.tags.get("a"), Some(&3));
    assert_eq!(record.tags.get("b"), Some(&1));
}

#[tokio::test]
async fn audio_segments_count_additively() {
    let harness = Harness::new();
    let segment = |label: &str, confidence| SegmentDetection {
        label: label.to_string(),
        confidence,
        start_seconds: 0.0,
        end_seconds: 3.0,
    };
    let engine = MockEngine::default().with_audio_rows(vec![
        segment("Owl", 0.8),
        segment("Owl", 0.6),
        segment("Owl", 0.05), // below minimum confidence
    ]);
    let pipeline = harness.pipeline(engine);

    let event = harness.seed("clips/night.mp3").await;
    pipeline.process(&event).await.unwrap();

    let record = harness.media.snapshot(event.file_id).unwrap();
    assert_eq!(record.file_type, Some(MediaKind::Audio));
    assert_eq!(record.tags.get("owl"), Some(&2));
}

#[tokio::test]
async fn empty_detection_result_completes_without_fanout() {
    let harness = Harness::new();
    harness
        .registry
        .subscribe("alice@example.com", "sparrow")
        .await
        .unwrap();
    let pipeline = harness.pipeline(MockEngine::default());

    let event = harness.seed("uploads/images/empty.jpg").await;
    let outcome = pipeline.process(&event).await.unwrap();

    let ProcessOutcome::Completed { record, fanout } = outcome else {
        panic!("expected completion");
    };
    assert_eq!(record.status, MediaStatus::Done);
    assert!(record.tags.is_empty());
    assert!(fanout.published.is_empty());
    assert!(harness.channels.published("notifications-sparrow").is_empty());
}

#[tokio::test]
async fn unknown_record_id_surfaces_lookup_error() {
    let harness = Harness::new();
    let pipeline = harness.pipeline(MockEngine::default());

    let event = ObjectEvent {
        file_id: Uuid::new_v4(),
        object_key: "uploads/images/ghost.jpg".to_string(),
    };
    let err = pipeline.process(&event).await.unwrap_err();
    assert!(matches!(err, PipelineError::Lookup(_)));
}

#[tokio::test]
async fn tags_stay_empty_through_pending_and_processing() {
    let harness = Harness::new();
    let event = harness.seed("uploads/images/a.jpg").await;

    assert!(harness.media.snapshot(event.file_id).unwrap().tags.is_empty());

    harness
        .media
        .mark_processing(event.file_id, MediaKind::Image)
        .await
        .unwrap();
    assert!(harness.media.snapshot(event.file_id).unwrap().tags.is_empty());

    let mut tags = TagMap::new();
    tags.insert("sparrow".to_string(), 1);
    harness.media.complete(event.file_id, &tags).await.unwrap();
    assert!(!harness.media.snapshot(event.file_id).unwrap().tags.is_empty());

    // An explicit reprocess empties the map again for the new attempt.
    harness
        .media
        .mark_processing(event.file_id, MediaKind::Image)
        .await
        .unwrap();
    assert!(harness.media.snapshot(event.file_id).unwrap().tags.is_empty());
}

#[tokio::test]
async fn worker_pool_processes_submitted_events() {
    let harness = Harness::new();
    let engine = MockEngine::default().with_image_rows(vec![detection("Sparrow", 0.9)]);
    let pipeline = Arc::new(harness.pipeline(engine));
    let worker = PipelineWorker::new(
        pipeline,
        WorkerConfig {
            max_workers: 2,
            queue_capacity: 8,
        },
    );

    let event = harness.seed("uploads/images/worker.jpg").await;
    worker.submit(event.clone()).await.unwrap();

    // The worker runs asynchronously; poll until the record leaves the
    // in-flight states.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let status = harness.media.snapshot(event.file_id).unwrap().status;
        if status == MediaStatus::Done {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "worker did not finish in time, status: {}",
            status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    worker.shutdown().await;
}
