//! Pipeline orchestration for one media record.
//!
//! Stages are strictly sequenced: Dispatch → Analyze → Aggregate →
//! Fan-out. Analysis failures always land the record in `error` status —
//! never silently swallowed with the record stuck in `processing`.
//! Fan-out failures are reported but never roll the completed record
//! back.

use std::sync::Arc;

use uuid::Uuid;

use birdtag_core::{MediaKind, MediaRecord, PipelineError};
use birdtag_db::MediaStore;
use birdtag_engines::{Analyzer, TagAnalysis};
use birdtag_notify::{FanoutReport, NotificationFanout};
use birdtag_storage::ObjectStore;

use crate::dispatcher::classify;
use crate::thumbnail::Thumbnailer;

/// Trigger for one processing attempt of one record. Delivery is
/// at-least-once: the same event may arrive more than once.
#[derive(Debug, Clone)]
pub struct ObjectEvent {
    pub file_id: Uuid,
    pub object_key: String,
}

/// What one processing attempt did.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Unsupported file type; the record was left untouched.
    Skipped,
    /// Analysis failed; the record was routed to `error` status.
    Failed(PipelineError),
    /// Tags persisted and fan-out dispatched.
    Completed {
        record: MediaRecord,
        fanout: FanoutReport,
    },
}

pub struct TaggingPipeline {
    media: Arc<dyn MediaStore>,
    storage: Arc<dyn ObjectStore>,
    analyzer: Analyzer,
    fanout: NotificationFanout,
    thumbnailer: Option<Arc<dyn Thumbnailer>>,
}

impl TaggingPipeline {
    pub fn new(
        media: Arc<dyn MediaStore>,
        storage: Arc<dyn ObjectStore>,
        analyzer: Analyzer,
        fanout: NotificationFanout,
        thumbnailer: Option<Arc<dyn Thumbnailer>>,
    ) -> Self {
        Self {
            media,
            storage,
            analyzer,
            fanout,
            thumbnailer,
        }
    }

    /// Process one stored-object event end to end.
    ///
    /// Returns `Err` only for infrastructure failures around the status
    /// machine itself (e.g. the metadata store being unreachable);
    /// analysis failures are reported as `ProcessOutcome::Failed` with the
    /// record already moved to `error`.
    #[tracing::instrument(skip(self, event), fields(file_id = %event.file_id, key = %event.object_key))]
    pub async fn process(&self, event: &ObjectEvent) -> Result<ProcessOutcome, PipelineError> {
        let kind = match classify(&event.object_key) {
            Some(kind) => kind,
            None => {
                tracing::info!("Unsupported file type, skipping");
                return Ok(ProcessOutcome::Skipped);
            }
        };

        // Explicit entry into a new attempt; sets file_type on first
        // classification.
        let record = self.media.mark_processing(event.file_id, kind).await?;

        // Thumbnails are an independent, fire-and-forget side effect for
        // images only; their failure never affects tagging.
        if kind == MediaKind::Image {
            self.spawn_thumbnail(event.file_id, record.object_key.clone());
        }

        let analysis = match self.analyze(&record, kind).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(error = %e, "Analysis failed, routing record to error status");
                self.media.fail(event.file_id).await?;
                return Ok(ProcessOutcome::Failed(e));
            }
        };

        // Atomic overwrite of tags + status; replacement, never
        // accumulation across attempts.
        let record = self.media.complete(event.file_id, &analysis.tags).await?;

        // Fan-out reads the tag map only after the atomic write above.
        let fanout = if record.tags.is_empty() {
            tracing::info!("No tags detected, skipping fan-out");
            FanoutReport::default()
        } else {
            self.fanout.dispatch(&record).await
        };

        Ok(ProcessOutcome::Completed { record, fanout })
    }

    /// Download the object and run the kind's analyzer. May block for the
    /// duration of inference (up to minutes for long video); no per-record
    /// locks are held meanwhile.
    async fn analyze(
        &self,
        record: &MediaRecord,
        kind: MediaKind,
    ) -> Result<TagAnalysis, PipelineError> {
        let content = self.storage.download(&record.object_key).await?;
        self.analyzer.detect(&content, kind).await
    }

    fn spawn_thumbnail(&self, file_id: Uuid, object_key: String) {
        let Some(thumbnailer) = self.thumbnailer.clone() else {
            return;
        };
        let media = self.media.clone();
        tokio::spawn(async move {
            match thumbnailer.generate(file_id, &object_key).await {
                Ok(url) => {
                    if let Err(e) = media.set_thumbnail_url(file_id, &url).await {
                        tracing::warn!(file_id = %file_id, error = %e, "Failed to record thumbnail URL");
                    }
                }
                Err(e) => {
                    tracing::warn!(file_id = %file_id, error = %e, "Thumbnail generation failed");
                }
            }
        });
    }
}
