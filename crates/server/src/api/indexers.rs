//! Source listing and testing.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use trawl_core::{CapabilityEntry, SourceTestOutcome};

use super::error::{ApiError, ErrorResponse};
use super::middleware::AuthUser;
use super::params::WireParams;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub configured: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexersResponse {
    pub indexers: Vec<CapabilityEntry>,
}

/// GET /api/v2.0/indexers
///
/// Every registered source with its capabilities and health.
pub async fn list_indexers(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<IndexersResponse>, (StatusCode, Json<ErrorResponse>)> {
    let wire = WireParams {
        configured: params.configured,
        ..Default::default()
    };
    let configured = wire.configured().map_err(|e| ApiError::from(e).into_json())?;

    state
        .aggregator()
        .capabilities("all", configured)
        .map(|indexers| Json(IndexersResponse { indexers }))
        .map_err(|e| ApiError::from(e).into_json())
}

/// POST /api/v2.0/indexers/{id}/test
///
/// Run a probe search against one source and record the result.
pub async fn test_indexer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AuthUser(user): AuthUser,
) -> Result<Json<SourceTestOutcome>, (StatusCode, Json<ErrorResponse>)> {
    info!(source = %id, user = %user, "Source test requested");
    state
        .aggregator()
        .test_source(&id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from(e).into_json())
}
