use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::Path;
use axum::routing::get;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shipwatch_core::Order;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub product_title: String,
    #[serde(default)]
    pub product_url: String,
    #[serde(default)]
    pub product_image: String,
    #[serde(default)]
    pub tracking_number: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order_date: String,
    #[serde(default)]
    pub order_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrderRequest {
    pub product_title: Option<String>,
    pub tracking_number: Option<String>,
    pub product_image: Option<String>,
    pub order_date: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub order: Order,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub message: String,
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> axum::Router {
    axum::Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", axum::routing::put(update_order).delete(delete_order))
}

#[tracing::instrument(level = "debug", skip_all)]
pub async fn list_orders(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<OrdersResponse>, ApiError> {
    Ok(Json(OrdersResponse {
        orders: state.orders.list().await?,
    }))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn create_order(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let id = state.orders.next_order_id().await?;
    let mut order = Order::new(id);
    order.product_title = req.product_title.trim().to_string();
    order.product_url = req.product_url.trim().to_string();
    order.product_image = req.product_image.trim().to_string();
    order.tracking_number = req.tracking_number.trim().to_string();
    if let Some(status) = req.status.filter(|s| !s.trim().is_empty()) {
        order.status = status;
    }
    order.order_date = req.order_date;
    order.order_id = req.order_id;
    order.added_date = Utc::now().to_rfc3339();

    let has_tracking = !order.tracking_number.is_empty();
    state.orders.upsert(order).await?;
    save_best_effort(&state).await;

    // A freshly supplied tracking number gets an immediate bulk lookup;
    // a lookup failure must not fail the create.
    if has_tracking {
        if let Err(error) = state
            .engine
            .refresh_order(id, shipwatch_carriers::cainiao::CARRIER_ID)
            .await
        {
            tracing::warn!(order_id = id, %error, "initial tracking refresh failed");
        }
    }

    let order = require_order(&state, id).await?;
    Ok(Json(OrderResponse {
        order,
        message: "Order added successfully".to_string(),
    }))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn update_order(
    Path(id): Path<u64>,
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let mut order = require_order(&state, id).await?;

    if let Some(title) = req.product_title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        order.product_title = title.to_string();
    }
    if let Some(image) = req.product_image.as_deref().map(str::trim).filter(|i| !i.is_empty()) {
        order.product_image = image.to_string();
    }
    if let Some(order_date) = req.order_date {
        order.order_date = order_date;
    }
    if let Some(status) = req.status.filter(|s| !s.trim().is_empty()) {
        order.status = status;
    }

    let mut tracking_changed = false;
    if let Some(tracking_number) = req.tracking_number {
        let tracking_number = tracking_number.trim().to_string();
        if tracking_number != order.tracking_number {
            order.tracking_number = tracking_number;
            tracking_changed = true;
        }
    }

    let has_tracking = !order.tracking_number.is_empty();
    state.orders.upsert(order).await?;
    save_best_effort(&state).await;

    if tracking_changed && has_tracking {
        if let Err(error) = state
            .engine
            .refresh_order(id, shipwatch_carriers::cainiao::CARRIER_ID)
            .await
        {
            tracing::warn!(order_id = id, %error, "tracking refresh after edit failed");
        }
    }

    let order = require_order(&state, id).await?;
    Ok(Json(OrderResponse {
        order,
        message: "Order updated successfully".to_string(),
    }))
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn delete_order(
    Path(id): Path<u64>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<DeletedResponse>, ApiError> {
    if !state.orders.delete(id).await? {
        return Err(ApiError::Core(shipwatch_core::Error::NotFound(format!(
            "order {id} not found"
        ))));
    }
    save_best_effort(&state).await;
    Ok(Json(DeletedResponse {
        message: "Order deleted successfully".to_string(),
    }))
}

async fn require_order(state: &AppState, id: u64) -> Result<Order, ApiError> {
    state
        .orders
        .get(id)
        .await?
        .ok_or_else(|| ApiError::Core(shipwatch_core::Error::NotFound(format!("order {id} not found"))))
}

async fn save_best_effort(state: &AppState) {
    if let Err(error) = state.orders.save().await {
        tracing::warn!(%error, "failed to persist orders");
    }
}
