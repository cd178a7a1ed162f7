//! HTTP endpoints exposing engine status.
//!
//! # Endpoints
//! - `GET /health`: full snapshot, overall status included
//! - `GET /health/services`: per-service health only
//!
//! Read-only by design; nothing here mutates engine state.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::broadcast;

use crate::engine::snapshot::{EngineSnapshot, ServiceSnapshot};
use crate::engine::ResilienceEngine;

pub fn router(engine: Arc<ResilienceEngine>) -> Router {
    Router::new()
        .route("/health", get(system_status))
        .route("/health/services", get(service_statuses))
        .with_state(engine)
}

async fn system_status(State(engine): State<Arc<ResilienceEngine>>) -> Json<EngineSnapshot> {
    Json(engine.snapshot())
}

async fn service_statuses(
    State(engine): State<Arc<ResilienceEngine>>,
) -> Json<BTreeMap<String, ServiceSnapshot>> {
    Json(engine.snapshot().services)
}

/// Serve the status endpoints until the shutdown broadcast fires.
pub async fn serve(
    engine: Arc<ResilienceEngine>,
    addr: SocketAddr,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "status endpoints listening");

    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await
}
