//! Worker pool: consumes object events and processes each record as an
//! independent unit of work.
//!
//! Concurrency is bounded by a semaphore; there is no ordering guarantee
//! between records and no cross-record state, so MediaRecord updates
//! never contend.

use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use birdtag_core::PipelineError;

use crate::pipeline::{ObjectEvent, ProcessOutcome, TaggingPipeline};

#[derive(Clone)]
pub struct WorkerConfig {
    pub max_workers: usize,
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            queue_capacity: 256,
        }
    }
}

/// Handle for submitting object events to the worker pool.
#[derive(Clone)]
pub struct PipelineWorker {
    submit_tx: mpsc::Sender<ObjectEvent>,
    shutdown_tx: mpsc::Sender<()>,
}

impl PipelineWorker {
    pub fn new(pipeline: Arc<TaggingPipeline>, config: WorkerConfig) -> Self {
        let (submit_tx, submit_rx) = mpsc::channel(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(Self::worker_pool(pipeline, config, submit_rx, shutdown_rx));

        Self {
            submit_tx,
            shutdown_tx,
        }
    }

    /// Enqueue one processing trigger.
    pub async fn submit(&self, event: ObjectEvent) -> Result<(), PipelineError> {
        self.submit_tx.send(event).await.map_err(|_| {
            PipelineError::Internal(anyhow::anyhow!("pipeline worker queue is closed"))
        })
    }

    pub async fn shutdown(&self) {
        tracing::info!("Initiating pipeline worker shutdown");
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn worker_pool(
        pipeline: Arc<TaggingPipeline>,
        config: WorkerConfig,
        mut submit_rx: mpsc::Receiver<ObjectEvent>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(max_workers = config.max_workers, "Pipeline worker pool started");
        let semaphore = Arc::new(Semaphore::new(config.max_workers));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Pipeline worker pool shutting down");
                    break;
                }
                event = submit_rx.recv() => {
                    let Some(event) = event else { break };
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let pipeline = pipeline.clone();
                    tokio::spawn(async move {
                        let _permit = permit;
                        Self::run_one(pipeline, event).await;
                    });
                }
            }
        }

        tracing::info!("Pipeline worker pool stopped");
    }

    async fn run_one(pipeline: Arc<TaggingPipeline>, event: ObjectEvent) {
        match pipeline.process(&event).await {
            Ok(ProcessOutcome::Completed { record, fanout }) => {
                tracing::info!(
                    file_id = %event.file_id,
                    tag_count = record.tags.len(),
                    notifications = fanout.published.len(),
                    "Record processed"
                );
            }
            Ok(ProcessOutcome::Skipped) => {
                tracing::info!(file_id = %event.file_id, "Record skipped (unsupported type)");
            }
            Ok(ProcessOutcome::Failed(e)) => {
                tracing::warn!(file_id = %event.file_id, error = %e, "Record failed analysis");
            }
            Err(e) => {
                tracing::error!(file_id = %event.file_id, error = %e, "Pipeline infrastructure error");
            }
        }
    }
}
