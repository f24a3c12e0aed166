use anyhow::Context;

use gatehouse_api::config::ApiConfig;
use gatehouse_observability::LogConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::from_env()?;

    gatehouse_observability::init(&LogConfig {
        file: config.log_file.clone(),
        ..LogConfig::default()
    })?;

    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }
    if !config.admin_bind_addr.ip().is_loopback() {
        tracing::warn!(addr = %config.admin_bind_addr, "admin listener is not bound to loopback");
    }

    let app = gatehouse_api::app::build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let admin_listener = tokio::net::TcpListener::bind(config.admin_bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.admin_bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        admin_addr = %admin_listener.local_addr()?,
        "listening"
    );

    tokio::try_join!(
        async { axum::serve(listener, app.public).await },
        async { axum::serve(admin_listener, app.admin).await },
    )?;

    Ok(())
}
