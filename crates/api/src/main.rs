use std::net::SocketAddr;

use anyhow::Context;
use gateway_infra::config::GatewayConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gateway_observability::init();

    let config = GatewayConfig::from_env().context("invalid configuration")?;
    let app = gateway_api::app::build_app(&config).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        persistent = config.use_persistent_stores,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
