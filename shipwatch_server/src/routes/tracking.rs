use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::Path;
use axum::routing::post;
use axum::{Extension, Json};
use serde::Serialize;
use shipwatch_core::{Order, OrderRefreshResult, RefreshReport};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct RefreshOneResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub order: Order,
}

#[derive(Debug, Serialize)]
pub struct RefreshAllResponse {
    pub success: bool,
    pub updated: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total: u64,
    pub results: Vec<OrderRefreshResult>,
    pub message: String,
}

impl From<RefreshReport> for RefreshAllResponse {
    fn from(report: RefreshReport) -> Self {
        let message = report.summary();
        Self {
            success: true,
            updated: report.updated,
            failed: report.failed,
            skipped: report.skipped,
            total: report.total,
            results: report.results,
            message,
        }
    }
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/orders/{id}/tracking", post(refresh_tracking))
        .route("/orders/{id}/doar-tracking", post(refresh_doar_tracking))
        .route("/orders/refresh-all", post(refresh_all))
        .route("/orders/refresh-all-doar", post(refresh_all_doar))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn refresh_tracking(
    Path(id): Path<u64>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<RefreshOneResponse>, ApiError> {
    refresh_one(&state, id, shipwatch_carriers::cainiao::CARRIER_ID).await
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn refresh_doar_tracking(
    Path(id): Path<u64>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<RefreshOneResponse>, ApiError> {
    refresh_one(&state, id, shipwatch_carriers::israel_post::CARRIER_ID).await
}

async fn refresh_one(
    state: &AppState,
    id: u64,
    carrier_id: &str,
) -> Result<Json<RefreshOneResponse>, ApiError> {
    let result = state.engine.refresh_order(id, carrier_id).await?;
    let order = state
        .orders
        .get(id)
        .await?
        .ok_or_else(|| ApiError::Core(shipwatch_core::Error::NotFound(format!("order {id} not found"))))?;
    Ok(Json(RefreshOneResponse {
        success: result.success,
        error: result.error,
        order,
    }))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn refresh_all(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<RefreshAllResponse>, ApiError> {
    let report = state
        .engine
        .refresh_all(shipwatch_carriers::cainiao::CARRIER_ID)
        .await?;
    Ok(Json(report.into()))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn refresh_all_doar(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<RefreshAllResponse>, ApiError> {
    let report = state
        .engine
        .refresh_all(shipwatch_carriers::israel_post::CARRIER_ID)
        .await?;
    Ok(Json(report.into()))
}
