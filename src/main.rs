//! Attack detector entrypoint: loads the model bundle, starts the scoring
//! worker and serves the HTTP API until Ctrl+C.

use anyhow::Context;
use attack_detector::{api, DetectorConfig, DetectorContext, StructuredLogger};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = DetectorConfig::path_from_env();
    let mut config = DetectorConfig::load(&config_path)?;
    config.apply_env_overrides();

    StructuredLogger::init(&config.log);
    info!(
        config = %config_path.display(),
        model_dir = %config.model_dir.display(),
        "attack detector starting"
    );

    let ctx = match DetectorContext::build(config) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e.into());
        }
    };
    info!(model_version = ctx.model_version(), "model bundle loaded");
    ctx.detector().start()?;

    let (stop_tx, mut stop_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    })
    .context("installing Ctrl+C handler")?;

    let bind = ctx.config().server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    info!(addr = %bind, "listening");

    let app = api::router(ctx.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop_rx.changed().await;
            info!("shutdown requested");
        })
        .await
        .context("http server")?;

    ctx.detector().stop().await;
    info!("attack detector stopped");
    Ok(())
}
