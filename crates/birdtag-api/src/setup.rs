//! Wire clients and components together from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use birdtag_core::{Config, StorageBackend};
use birdtag_db::{MediaRepository, MediaStore, SubscriptionRepository, SubscriptionStore};
use birdtag_engines::{Analyzer, ModelServerClient};
use birdtag_notify::{ChannelService, NotificationFanout, SnsChannelService, SubscriptionRegistry};
use birdtag_pipeline::{
    ImageThumbnailer, PipelineWorker, TaggingPipeline, Thumbnailer, WorkerConfig,
};
use birdtag_storage::{LocalObjectStore, ObjectStore, S3ObjectStore};

use crate::state::AppState;

pub async fn build_state(config: Config) -> Result<Arc<AppState>> {
    let pool = birdtag_db::connect(&config.database_url, config.db_max_connections).await?;
    let media: Arc<dyn MediaStore> = Arc::new(MediaRepository::new(pool.clone()));
    let subscriptions: Arc<dyn SubscriptionStore> = Arc::new(SubscriptionRepository::new(pool));

    let storage: Arc<dyn ObjectStore> = match config.storage_backend {
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket
                .clone()
                .context("S3_BUCKET is required for the s3 backend")?;
            let region = config
                .s3_region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_string());
            Arc::new(S3ObjectStore::new(bucket, region, config.s3_endpoint.clone()).await?)
        }
        StorageBackend::Local => {
            let path = config
                .local_storage_path
                .clone()
                .context("LOCAL_STORAGE_PATH is required for the local backend")?;
            let base_url = config.local_storage_base_url.clone().unwrap_or_else(|| {
                format!("http://localhost:{}/media", config.server_port)
            });
            Arc::new(LocalObjectStore::new(path, base_url).await?)
        }
    };

    let channels: Arc<dyn ChannelService> = {
        let region = config
            .sns_region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());
        Arc::new(SnsChannelService::new(region).await)
    };
    let registry = SubscriptionRegistry::new(subscriptions, channels.clone());

    let engine = Arc::new(ModelServerClient::new(
        config.model_server_url.clone(),
        Duration::from_secs(config.engine_timeout_seconds),
    )?);
    let analyzer = Analyzer::new(
        engine,
        config.confidence_threshold,
        config.audio_min_confidence,
    );

    let fanout = NotificationFanout::new(registry.clone(), channels);
    let thumbnailer: Arc<dyn Thumbnailer> = Arc::new(ImageThumbnailer::new(storage.clone()));
    let pipeline = Arc::new(TaggingPipeline::new(
        media.clone(),
        storage.clone(),
        analyzer,
        fanout,
        Some(thumbnailer),
    ));

    let worker = PipelineWorker::new(
        pipeline,
        WorkerConfig {
            max_workers: config.worker_max_workers,
            queue_capacity: config.worker_queue_capacity,
        },
    );

    Ok(Arc::new(AppState {
        config,
        media,
        storage,
        registry,
        worker,
    }))
}
