use anyhow::Context;

use crm_api::app::{build_app, AppServices};
use crm_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env_and_file(".env").context("invalid configuration")?;
    crm_observability::init(config.log_format);

    if config.uses_dev_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let services = AppServices::from_config(&config).await?;
    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        environment = %config.environment,
        "listening"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
