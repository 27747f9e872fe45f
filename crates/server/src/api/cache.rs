//! Result cache administration.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use tracing::info;
use trawl_core::CacheStats;

use super::middleware::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// GET /api/v2.0/server/cache
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.cache().stats())
}

/// DELETE /api/v2.0/server/cache
pub async fn clear_cache(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> Json<SuccessResponse> {
    let entries = state.cache().stats().total_entries;
    state.cache().clear();
    info!(entries, user = %user, "Result cache cleared");
    Json(SuccessResponse {
        message: format!("Cleared {} cached queries", entries),
    })
}
