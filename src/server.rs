use crate::config::MetricConfig;
use crate::emitter::{EmitReport, MetricChunk, MetricEmitter};
use crate::error::ConfigError;
use crate::model::RawAuditRecord;
use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use crossbeam_channel::{Receiver, Sender};
use futures::stream::Stream;
use serde_json::Value;
use std::sync::Arc;
use std::thread;
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Settings as last accepted and the emitter built from them.
struct Pipeline {
    config: MetricConfig,
    emitter: MetricEmitter,
}

pub struct AppState {
    // Swapped as a whole on every configuration change
    pipeline: RwLock<Pipeline>,
    // Shared by every emitter; the bridge thread drains the other end
    sender: Sender<MetricChunk>,
    // Fan-out to SSE clients
    tx_events: broadcast::Sender<MetricChunk>,
}

impl AppState {
    pub fn new(
        config: MetricConfig,
        sender: Sender<MetricChunk>,
        tx_events: broadcast::Sender<MetricChunk>,
    ) -> Result<Self, ConfigError> {
        let emitter = MetricEmitter::new(&config, sender.clone())?;
        Ok(Self {
            pipeline: RwLock::new(Pipeline { config, emitter }),
            sender,
            tx_events,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/config", post(update_config).get(get_config))
        .route("/api/audit", post(ingest_audit))
        .route("/api/metrics/stream", get(sse_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Forwards emitted chunks from the emitter channel to the SSE broadcast.
pub fn spawn_bridge(receiver: Receiver<MetricChunk>, tx_events: broadcast::Sender<MetricChunk>) {
    thread::spawn(move || {
        while let Ok(chunk) = receiver.recv() {
            // No subscribers is fine
            let _ = tx_events.send(chunk);
        }
    });
}

// Handlers

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<MetricConfig>,
) -> Result<Json<String>, (StatusCode, String)> {
    let emitter = MetricEmitter::new(&payload, state.sender.clone()).map_err(|err| {
        warn!(error = %err, "rejected configuration");
        (StatusCode::BAD_REQUEST, err.to_string())
    })?;

    *state.pipeline.write().await = Pipeline {
        config: payload,
        emitter,
    };
    info!("configuration updated");
    Ok(Json("Config updated".to_string()))
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<MetricConfig> {
    Json(state.pipeline.read().await.config.clone())
}

/// Accepts a JSON array of audit records as one batch. Non-object entries
/// count as empty records.
async fn ingest_audit(
    State(state): State<Arc<AppState>>,
    Json(records): Json<Vec<Value>>,
) -> Result<Json<EmitReport>, (StatusCode, String)> {
    let received = Utc::now();
    let batch = records
        .into_iter()
        .map(|value| (received, RawAuditRecord::from_value(value).unwrap_or_default()));

    let pipeline = state.pipeline.read().await;
    pipeline
        .emitter
        .emit(batch)
        .map(Json)
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")))
}

async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, axum::BoxError>>> {
    let mut rx = state.tx_events.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(chunk) => yield Event::default().json_data(&chunk).map_err(axum::BoxError::from),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "metric stream subscriber lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
