mod config;
mod routes;

use anyhow::Context;
use realtime_voice::UpstreamCredentialProvider;
use tracing::info;

use crate::config::Config;
use crate::routes::{router, AppState, TOKEN_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load token service configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    info!("configuration loaded: {:?}", config);

    let provider = UpstreamCredentialProvider::new(&config.upstream());
    let app = router(AppState::new(provider));

    info!(
        "token service listening on {}, GET {}",
        config.bind_address, TOKEN_PATH
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;

    axum::serve(listener, app).await?;

    Ok(())
}
