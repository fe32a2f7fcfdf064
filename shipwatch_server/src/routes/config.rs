use crate::error::ApiError;
use crate::server::AppState;
use axum::routing::get;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct IntervalResponse {
    pub hours: u32,
}

#[derive(Debug, Deserialize)]
pub struct PutIntervalRequest {
    pub hours: u32,
}

#[derive(Debug, Serialize)]
pub struct KeyPresenceResponse {
    pub configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct PutKeyRequest {
    pub api_key: String,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new()
        .route(
            "/config/auto-update-interval",
            get(get_interval).put(put_interval),
        )
        .route("/config/israel-post-key", get(get_key).put(put_key))
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn get_interval(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<IntervalResponse>, ApiError> {
    Ok(Json(IntervalResponse {
        hours: state.config.auto_update_interval_hours().await?,
    }))
}

/// The new interval takes effect at the next (re)arm; the currently armed
/// timer keeps its deadline.
#[tracing::instrument(level = "info", skip_all)]
pub async fn put_interval(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<PutIntervalRequest>,
) -> Result<Json<IntervalResponse>, ApiError> {
    state.config.set_auto_update_interval_hours(req.hours).await?;
    Ok(Json(IntervalResponse { hours: req.hours }))
}

/// Reports presence only; the key itself is never returned.
#[tracing::instrument(level = "debug", skip_all)]
pub async fn get_key(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<KeyPresenceResponse>, ApiError> {
    let key = state
        .config
        .carrier_credential(shipwatch_carriers::israel_post::CARRIER_ID)
        .await?;
    Ok(Json(KeyPresenceResponse {
        configured: key.is_some_and(|k| !k.trim().is_empty()),
    }))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn put_key(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<PutKeyRequest>,
) -> Result<Json<KeyPresenceResponse>, ApiError> {
    state
        .config
        .set_carrier_credential(shipwatch_carriers::israel_post::CARRIER_ID, &req.api_key)
        .await?;
    Ok(Json(KeyPresenceResponse {
        configured: !req.api_key.trim().is_empty(),
    }))
}
