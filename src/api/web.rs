//! Web API for statistics and catalog endpoints
//!
//! Endpoints:
//!   GET  /stats                  -> Global play statistics
//!   GET  /track-stats/{track_id} -> Per-track statistics
//!   POST /reset-stats            -> Zero all counters
//!   GET  /tracks                 -> Playable track catalog
//!   GET  /health                 -> Liveness probe
//!
//! The server nests this router under `/api` and additionally mounts
//! [`health_check`] at the root `/health`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::{Track, TrackCatalog};
use crate::stats::{StatsStore, TrackStatsView};

#[derive(Clone)]
pub struct WebApiState {
    pub stats: Arc<StatsStore>,
    pub catalog: Arc<TrackCatalog>,
    /// Acceptance threshold, echoed in the stats response
    pub threshold: f64,
}

impl WebApiState {
    pub fn new(stats: Arc<StatsStore>, catalog: Arc<TrackCatalog>, threshold: f64) -> Self {
        Self {
            stats,
            catalog,
            threshold,
        }
    }
}

/// Global statistics response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_verifications: u64,
    pub verified_plays: u64,
    pub blocked_plays: u64,
    pub track_stats: HashMap<String, TrackStatsView>,
    pub threshold: f64,
    pub verification_rate: String,
}

/// Per-track statistics response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStatsResponse {
    pub track_id: String,
    #[serde(flatten)]
    pub stats: TrackStatsView,
}

/// Reset acknowledgement
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
}

/// Error body for lookup failures
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Global counters plus every track's statistics
pub async fn get_stats(State(state): State<WebApiState>) -> Json<StatsResponse> {
    let snapshot = state.stats.global_snapshot().await;

    Json(StatsResponse {
        total_verifications: snapshot.total_verifications,
        verified_plays: snapshot.verified_plays,
        blocked_plays: snapshot.blocked_plays,
        track_stats: snapshot.track_stats,
        threshold: state.threshold,
        verification_rate: snapshot.verification_rate,
    })
}

/// Statistics for one track, 404 when it has no recorded attempts
pub async fn get_track_stats(
    State(state): State<WebApiState>,
    Path(track_id): Path<String>,
) -> Result<Json<TrackStatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.stats.track_snapshot(&track_id).await {
        Some(stats) => Ok(Json(TrackStatsResponse { track_id, stats })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "Track not found".to_string(),
            }),
        )),
    }
}

/// Zero all counters and histories
pub async fn reset_stats(State(state): State<WebApiState>) -> Json<ResetResponse> {
    state.stats.reset().await;

    Json(ResetResponse {
        success: true,
        message: "Stats reset successfully".to_string(),
    })
}

/// The playable track catalog
pub async fn list_tracks(State(state): State<WebApiState>) -> Json<Vec<Track>> {
    Json(state.catalog.tracks().to_vec())
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub fn create_router(state: WebApiState) -> Router {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/track-stats/{track_id}", get(get_track_stats))
        .route("/reset-stats", post(reset_stats))
        .route("/tracks", get(list_tracks))
        .route("/health", get(health_check))
        .with_state(state)
}
