use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::middleware::{auth_middleware, metrics_middleware};
use super::{cache, handlers, indexers, search};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Torznab-compatible surface
    let wire_routes = Router::new()
        .route("/indexers", get(indexers::list_indexers))
        .route("/indexers/{scope}/test", post(indexers::test_indexer))
        .route("/indexers/{scope}/results", get(search::results))
        .route("/indexers/{scope}/results/torznab", get(search::torznab))
        .route("/indexers/{scope}/results/torznab/api", get(search::torznab))
        .route("/indexers/{scope}/results/potato", get(search::potato))
        .route("/indexers/{scope}/results/potato/api", get(search::potato))
        .route(
            "/server/cache",
            get(cache::get_stats).delete(cache::clear_cache),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/config", get(handlers::get_config))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v2.0", wire_routes)
        .nest("/api/v1", admin_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
