//! Configuration module
//!
//! Environment-driven configuration for the API and pipeline. Clients
//! (database pool, object store, channel service, engine client) are
//! constructed once from this config and passed into components
//! explicitly; nothing here is a process-wide global.

use std::env;

use crate::constants::{DEFAULT_AUDIO_MIN_CONFIDENCE, DEFAULT_CONFIDENCE_THRESHOLD};

/// Which object-store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    S3,
    Local,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub environment: String,
    // Object store
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    // Detection engines
    pub model_server_url: String,
    pub engine_timeout_seconds: u64,
    pub confidence_threshold: f32,
    pub audio_min_confidence: f32,
    // Notification channels
    pub sns_region: Option<String>,
    // Upload limits
    pub max_upload_size_bytes: usize,
    // Pipeline worker pool
    pub worker_max_workers: usize,
    pub worker_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let storage_backend = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .to_lowercase()
            .as_str()
        {
            "local" => StorageBackend::Local,
            _ => StorageBackend::S3,
        };

        let config = Self {
            server_port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            model_server_url: env::var("MODEL_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:9090".to_string()),
            engine_timeout_seconds: env::var("ENGINE_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            confidence_threshold: env::var("CONFIDENCE_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            audio_min_confidence: env::var("AUDIO_MIN_CONFIDENCE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_AUDIO_MIN_CONFIDENCE),
            sns_region: env::var("SNS_REGION")
                .ok()
                .or_else(|| env::var("AWS_REGION").ok()),
            max_upload_size_bytes: env::var("MAX_UPLOAD_SIZE_MB")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(100)
                * 1024
                * 1024,
            worker_max_workers: env::var("WORKER_MAX_WORKERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4),
            worker_queue_capacity: env::var("WORKER_QUEUE_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(256),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.storage_backend == StorageBackend::S3 && self.s3_bucket.is_none() {
            anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3");
        }
        if self.storage_backend == StorageBackend::Local && self.local_storage_path.is_none() {
            anyhow::bail!("LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local");
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "CONFIDENCE_THRESHOLD must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.audio_min_confidence) {
            anyhow::bail!(
                "AUDIO_MIN_CONFIDENCE must be within [0, 1], got {}",
                self.audio_min_confidence
            );
        }
        if self.worker_max_workers == 0 {
            anyhow::bail!("WORKER_MAX_WORKERS must be at least 1");
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }
}
