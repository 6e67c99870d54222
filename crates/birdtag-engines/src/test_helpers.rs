//! Mock detection engine for testing without a model server.

use async_trait::async_trait;

use birdtag_core::PipelineError;

use crate::engine::{Detection, DetectionEngine, SegmentDetection, VideoInference};

#[derive(Debug, Clone, Copy)]
enum MockFailure {
    Decode,
    Engine,
}

/// Engine that returns scripted rows, or fails every call when configured
/// with a failure mode.
#[derive(Default)]
pub struct MockEngine {
    image_rows: Vec<Detection>,
    video: Option<VideoInference>,
    audio_rows: Vec<SegmentDetection>,
    failure: Option<(MockFailure, String)>,
}

impl MockEngine {
    pub fn with_image_rows(mut self, rows: Vec<Detection>) -> Self {
        self.image_rows = rows;
        self
    }

    pub fn with_video(mut self, inference: VideoInference) -> Self {
        self.video = Some(inference);
        self
    }

    pub fn with_audio_rows(mut self, rows: Vec<SegmentDetection>) -> Self {
        self.audio_rows = rows;
        self
    }

    pub fn failing_with_decode(mut self, message: &str) -> Self {
        self.failure = Some((MockFailure::Decode, message.to_string()));
        self
    }

    pub fn failing_with_engine(mut self, message: &str) -> Self {
        self.failure = Some((MockFailure::Engine, message.to_string()));
        self
    }

    fn check_failure(&self) -> Result<(), PipelineError> {
        match &self.failure {
            Some((MockFailure::Decode, msg)) => Err(PipelineError::Decode(msg.clone())),
            Some((MockFailure::Engine, msg)) => Err(PipelineError::Engine(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DetectionEngine for MockEngine {
    async fn infer_image(&self, _content: &[u8]) -> Result<Vec<Detection>, PipelineError> {
        self.check_failure()?;
        Ok(self.image_rows.clone())
    }

    async fn infer_video(&self, _content: &[u8]) -> Result<VideoInference, PipelineError> {
        self.check_failure()?;
        Ok(self.video.clone().unwrap_or(VideoInference {
            frames_scanned: 0,
            detections: Vec::new(),
        }))
    }

    async fn infer_audio(&self, _content: &[u8]) -> Result<Vec<SegmentDetection>, PipelineError> {
        self.check_failure()?;
        Ok(self.audio_rows.clone())
    }
}
