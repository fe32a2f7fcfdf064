use crate::error::ApiError;
use crate::server::AppState;
use axum::routing::get;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub next_auto_update: Option<DateTime<Utc>>,
    pub cainiao_last_update: Option<DateTime<Utc>>,
    pub israel_post_last_update: Option<DateTime<Utc>>,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new().route("/status", get(get_status))
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn get_status(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    let next_auto_update = match state.scheduler.next_update_time().await {
        Some(next) => Some(next),
        None => state.config.next_auto_update().await?,
    };
    Ok(Json(StatusResponse {
        next_auto_update,
        cainiao_last_update: state
            .config
            .carrier_last_update(shipwatch_carriers::cainiao::CARRIER_ID)
            .await?,
        israel_post_last_update: state
            .config
            .carrier_last_update(shipwatch_carriers::israel_post::CARRIER_ID)
            .await?,
    }))
}
