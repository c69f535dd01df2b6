use anyhow::Context;
use audit_log_metric::server::{self, AppState};
use audit_log_metric::MetricConfig;
use crossbeam_channel::unbounded;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:9357";
const DEFAULT_TAG: &str = "audit.metric";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let addr = std::env::var("AUDIT_METRIC_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());

    let config = MetricConfig {
        tag: Some(DEFAULT_TAG.to_string()),
        ..Default::default()
    };
    let (sender, receiver) = unbounded();
    let (tx_events, _) = broadcast::channel(100);
    server::spawn_bridge(receiver, tx_events.clone());

    let state = AppState::new(config, sender, tx_events).context("Invalid default configuration")?;
    let app = server::router(Arc::new(state));

    info!(%addr, "starting audit metric server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
