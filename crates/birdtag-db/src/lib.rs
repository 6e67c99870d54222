//! Metadata store for BirdTag.
//!
//! PostgreSQL repositories for media records and tag subscriptions, plus
//! the object-safe store traits consumed by the pipeline and notification
//! crates (so they can run against in-memory implementations in tests).

mod media;
mod subscription;
mod traits;

pub use media::MediaRepository;
pub use subscription::SubscriptionRepository;
pub use traits::{MediaStore, SubscriptionStore};

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Connect to PostgreSQL and run pending migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    Ok(pool)
}
