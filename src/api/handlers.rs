//! API Handlers
//!
//! HTTP request handlers for the admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};

use crate::cache::{CacheAside, CacheStore};
use crate::error::{Result, ServiceError};
use crate::metrics::{MetricsSummary, MetricsTracker, OperationSnapshot};
use crate::models::{
    CacheStatsResponse, ClearNamespaceResponse, ErrorResponse, HealthResponse, MessageResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<CacheStore>,
    pub metrics: Arc<MetricsTracker>,
    /// Cache-aside factory for the data routes a host service mounts next
    /// to this router. Shares `store` and `metrics`, so the admin endpoints
    /// report on its traffic.
    pub cache: CacheAside,
}

impl AppState {
    pub fn new(store: Arc<CacheStore>, metrics: Arc<MetricsTracker>) -> Self {
        let cache = CacheAside::new(Arc::clone(&store), Arc::clone(&metrics));
        Self {
            store,
            metrics,
            cache,
        }
    }
}

/// Counts every inbound request.
pub async fn count_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.metrics.record_request();
    next.run(request).await
}

/// Handler for GET /health
///
/// Healthy even when the cache is down; the cache state is reported alongside.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let available = state.store.is_available_async().await;
    Json(HealthResponse::healthy(available, state.store.backend_name()))
}

/// Handler for GET /cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(state.store.stats().await.into())
}

/// Handler for DELETE /cache/:namespace
///
/// Wildcards are rejected so one call can never reach past its namespace.
pub async fn clear_namespace_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<Json<ClearNamespaceResponse>> {
    if namespace.contains(['*', '?', '[', ']']) {
        return Err(ServiceError::InvalidRequest(format!(
            "namespace '{}' must not contain wildcards",
            namespace
        )));
    }

    let removed = state.store.clear_namespace_async(&namespace).await;
    Ok(Json(ClearNamespaceResponse::new(namespace, removed)))
}

/// Handler for GET /metrics
pub async fn metrics_summary_handler(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.metrics.get_summary())
}

/// Handler for GET /metrics/:name
pub async fn operation_metrics_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> std::result::Result<Json<OperationSnapshot>, (StatusCode, Json<ErrorResponse>)> {
    state.metrics.operation(&name).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new(format!("No metrics recorded for '{}'", name))),
        )
    })
}

/// Handler for POST /metrics/reset
pub async fn reset_metrics_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.metrics.reset();
    Json(MessageResponse::new("Metrics reset"))
}
