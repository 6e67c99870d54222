//! Analyzer adapters: normalize raw engine rows into a tag map.
//!
//! One aggregation policy per media kind:
//! - image: detections at or above the confidence threshold, counted per label
//! - video: per-frame counts folded with `max` per tag across frames; a
//!   subject visible in many frames is never multiplied by frame count
//! - audio: segments at or above the minimum confidence, counted
//!   additively across the whole clip

use std::collections::HashMap;
use std::sync::Arc;

use birdtag_core::models::normalize_tag;
use birdtag_core::{MediaKind, PipelineError, TagMap};

use crate::engine::DetectionEngine;

/// Result of one analysis attempt.
///
/// `frames_scanned` and `peak_confidence` are informational (video only);
/// they never gate anything.
#[derive(Debug, Clone)]
pub struct TagAnalysis {
    pub tags: TagMap,
    pub frames_scanned: Option<u32>,
    pub peak_confidence: Option<f32>,
}

impl TagAnalysis {
    fn from_tags(tags: TagMap) -> Self {
        Self {
            tags,
            frames_scanned: None,
            peak_confidence: None,
        }
    }
}

/// Uniform interface over the three engine capabilities.
#[derive(Clone)]
pub struct Analyzer {
    engine: Arc<dyn DetectionEngine>,
    confidence_threshold: f32,
    audio_min_confidence: f32,
}

impl Analyzer {
    pub fn new(
        engine: Arc<dyn DetectionEngine>,
        confidence_threshold: f32,
        audio_min_confidence: f32,
    ) -> Self {
        Self {
            engine,
            confidence_threshold,
            audio_min_confidence,
        }
    }

    /// Run detection for one media item and aggregate per the kind's
    /// policy. Decode and engine failures propagate unchanged.
    #[tracing::instrument(skip(self, content), fields(content_len = content.len()))]
    pub async fn detect(
        &self,
        content: &[u8],
        kind: MediaKind,
    ) -> Result<TagAnalysis, PipelineError> {
        match kind {
            MediaKind::Image => self.detect_image(content).await,
            MediaKind::Video => self.detect_video(content).await,
            MediaKind::Audio => self.detect_audio(content).await,
        }
    }

    async fn detect_image(&self, content: &[u8]) -> Result<TagAnalysis, PipelineError> {
        let detections = self.engine.infer_image(content).await?;

        let mut tags = TagMap::new();
        for detection in detections {
            if detection.confidence < self.confidence_threshold {
                continue;
            }
            *tags.entry(normalize_tag(&detection.label)).or_insert(0) += 1;
        }

        tracing::debug!(tag_count = tags.len(), "Image analysis complete");
        Ok(TagAnalysis::from_tags(tags))
    }

    async fn detect_video(&self, content: &[u8]) -> Result<TagAnalysis, PipelineError> {
        let inference = self.engine.infer_video(content).await?;

        // Per-frame tag counts first, then fold with max per tag. Frames
        // contributing zero detections for a tag leave the running max
        // unchanged.
        let mut per_frame: HashMap<u32, TagMap> = HashMap::new();
        let mut peak_confidence: Option<f32> = None;
        for detection in &inference.detections {
            if detection.confidence < self.confidence_threshold {
                continue;
            }
            peak_confidence = Some(match peak_confidence {
                Some(peak) => peak.max(detection.confidence),
                None => detection.confidence,
            });
            *per_frame
                .entry(detection.frame_index)
                .or_default()
                .entry(normalize_tag(&detection.label))
                .or_insert(0) += 1;
        }

        let mut tags = TagMap::new();
        for frame_tags in per_frame.values() {
            for (tag, count) in frame_tags {
                let entry = tags.entry(tag.clone()).or_insert(0);
                *entry = (*entry).max(*count);
            }
        }

        tracing::debug!(
            frames_scanned = inference.frames_scanned,
            tag_count = tags.len(),
            "Video analysis complete"
        );
        Ok(TagAnalysis {
            tags,
            frames_scanned: Some(inference.frames_scanned),
            peak_confidence,
        })
    }

    async fn detect_audio(&self, content: &[u8]) -> Result<TagAnalysis, PipelineError> {
        let segments = self.engine.infer_audio(content).await?;

        let mut tags = TagMap::new();
        for segment in segments {
            if segment.confidence < self.audio_min_confidence {
                continue;
            }
            *tags.entry(normalize_tag(&segment.label)).or_insert(0) += 1;
        }

        tracing::debug!(tag_count = tags.len(), "Audio analysis complete");
        Ok(TagAnalysis::from_tags(tags))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::MockEngine;
    use crate::engine::{Detection, FrameDetection, SegmentDetection, VideoInference};

    fn analyzer(engine: MockEngine) -> Analyzer {
        Analyzer::new(Arc::new(engine), 0.5, 0.1)
    }

    fn frame(frame_index: u32, label: &str, confidence: f32) -> FrameDetection {
        FrameDetection {
            frame_index,
            label: label.to_string(),
            confidence,
        }
    }

    #[tokio::test]
    async fn image_counts_detections_above_threshold() {
        let engine = MockEngine::default().with_image_rows(vec![
            Detection { label: "Sparrow".to_string(), confidence: 0.9 },
            Detection { label: "sparrow".to_string(), confidence: 0.7 },
            Detection { label: "Hawk".to_string(), confidence: 0.4 }, // below threshold
        ]);

        let analysis = analyzer(engine)
            .detect(b"jpeg", MediaKind::Image)
            .await
            .unwrap();

        assert_eq!(analysis.tags.get("sparrow"), Some(&2));
        assert!(!analysis.tags.contains_key("hawk"));
        assert!(analysis.frames_scanned.is_none());
    }

    #[tokio::test]
    async fn video_takes_max_per_frame_not_sum() {
        // Frames [{A:2}, {A:1, B:1}, {A:3}] must yield {A:3, B:1}.
        let engine = MockEngine::default().with_video(VideoInference {
            frames_scanned: 3,
            detections: vec![
                frame(0, "A", 0.9),
                frame(0, "A", 0.8),
                frame(1, "A", 0.9),
                frame(1, "B", 0.6),
                frame(2, "A", 0.9),
                frame(2, "A", 0.9),
                frame(2, "A", 0.7),
            ],
        });

        let analysis = analyzer(engine)
            .detect(b"mp4", MediaKind::Video)
            .await
            .unwrap();

        assert_eq!(analysis.tags.get("a"), Some(&3));
        assert_eq!(analysis.tags.get("b"), Some(&1));
        assert_eq!(analysis.frames_scanned, Some(3));
        assert_eq!(analysis.peak_confidence, Some(0.9));
    }

    #[tokio::test]
    async fn video_low_confidence_rows_do_not_count() {
        let engine = MockEngine::default().with_video(VideoInference {
            frames_scanned: 2,
            detections: vec![frame(0, "A", 0.3), frame(1, "A", 0.2)],
        });

        let analysis = analyzer(engine)
            .detect(b"mp4", MediaKind::Video)
            .await
            .unwrap();

        assert!(analysis.tags.is_empty());
        assert_eq!(analysis.peak_confidence, None);
    }

    #[tokio::test]
    async fn audio_accumulates_segments_above_min_confidence() {
        let engine = MockEngine::default().with_audio_rows(vec![
            SegmentDetection {
                label: "Sparrow".to_string(),
                confidence: 0.8,
                start_seconds: 0.0,
                end_seconds: 3.0,
            },
            SegmentDetection {
                label: "sparrow".to_string(),
                confidence: 0.2,
                start_seconds: 3.0,
                end_seconds: 6.0,
            },
            SegmentDetection {
                label: "Owl".to_string(),
                confidence: 0.05, // below min confidence
                start_seconds: 6.0,
                end_seconds: 9.0,
            },
        ]);

        let analysis = analyzer(engine)
            .detect(b"wav", MediaKind::Audio)
            .await
            .unwrap();

        assert_eq!(analysis.tags.get("sparrow"), Some(&2));
        assert!(!analysis.tags.contains_key("owl"));
    }

    #[tokio::test]
    async fn decode_errors_propagate() {
        let engine = MockEngine::default().failing_with_decode("bad codec");
        let err = analyzer(engine)
            .detect(b"junk", MediaKind::Video)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[tokio::test]
    async fn engine_errors_propagate() {
        let engine = MockEngine::default().failing_with_engine("inference crashed");
        let err = analyzer(engine)
            .detect(b"clip", MediaKind::Audio)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Engine(_)));
    }
}
