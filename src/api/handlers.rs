//! HTTP handlers for the on-demand cycle trigger and health check

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::{CycleReport, Engine};

/// Application state shared across handlers
pub struct AppState {
    pub engine: Arc<Engine>,
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub cycle_running: bool,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        cycle_running: state.engine.is_running(),
    })
}

// ============================================================================
// On-demand cycle
// ============================================================================

/// Runs one cycle synchronously; always 200, details are in the report
pub async fn scrap(State(state): State<Arc<AppState>>) -> Json<CycleReport> {
    tracing::info!("On-demand cycle requested");
    Json(state.engine.run_cycle().await)
}
