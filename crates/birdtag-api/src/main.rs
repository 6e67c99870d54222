use std::net::SocketAddr;

use anyhow::Result;

use birdtag_api::{routes, setup, telemetry};
use birdtag_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_telemetry();

    let config = Config::from_env()?;
    let port = config.server_port;
    let state = setup::build_state(config).await?;
    let router = routes::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "BirdTag API listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
