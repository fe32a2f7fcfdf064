use crate::routes;
use axum::routing::get;
use axum::{Extension, Router};
use shipwatch_carriers::{CainiaoAdapter, IsraelPostAdapter};
use shipwatch_core::store::json::{JsonConfigStore, JsonOrderStore};
use shipwatch_core::{AutoUpdateScheduler, ConfigStore, OrderStore, TrackingSyncEngine};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub orders: Arc<dyn OrderStore>,
    pub config: Arc<dyn ConfigStore>,
    pub engine: Arc<TrackingSyncEngine>,
    pub scheduler: Arc<AutoUpdateScheduler>,
    pub started_at: Instant,
}

/// Wire the JSON-file stores, the sync engine with both carrier adapters
/// (bulk first, so the auto pass runs it before the keyed one), and the
/// scheduler.
#[tracing::instrument(level = "info")]
pub async fn build_state(data_dir: PathBuf) -> anyhow::Result<AppState> {
    tokio::fs::create_dir_all(&data_dir).await?;

    let orders: Arc<dyn OrderStore> =
        Arc::new(JsonOrderStore::load(data_dir.join("orders.json")).await);
    let config: Arc<dyn ConfigStore> =
        Arc::new(JsonConfigStore::load(data_dir.join("settings.json")).await);

    let engine = Arc::new(TrackingSyncEngine::new(orders.clone(), config.clone()));
    engine.register_adapter(Arc::new(CainiaoAdapter::new())).await?;
    engine
        .register_adapter(Arc::new(IsraelPostAdapter::new(config.clone())))
        .await?;

    let scheduler = Arc::new(AutoUpdateScheduler::new(config.clone(), engine.clone()));

    Ok(AppState {
        orders,
        config,
        engine,
        scheduler,
        started_at: Instant::now(),
    })
}

#[tracing::instrument(level = "debug", skip_all)]
pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);
    Router::new()
        .merge(routes::router())
        .route("/health", get(routes::health::get_health))
        .layer(Extension(state))
        .layer(SetRequestIdLayer::new(
            axum::http::HeaderName::from_static("x-request-id"),
            MakeRequestUuid,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[tracing::instrument(level = "info", skip_all)]
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    state.scheduler.start().await;

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
