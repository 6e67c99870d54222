//! Application state shared by all handlers.
//!
//! Every client (metadata store, object store, channel service, engine
//! client) is constructed once at startup and passed in explicitly;
//! components never reach for process-wide globals.

use std::sync::Arc;

use birdtag_core::Config;
use birdtag_db::MediaStore;
use birdtag_notify::SubscriptionRegistry;
use birdtag_pipeline::PipelineWorker;
use birdtag_storage::ObjectStore;

pub struct AppState {
    pub config: Config,
    pub media: Arc<dyn MediaStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub registry: SubscriptionRegistry,
    pub worker: PipelineWorker,
}
