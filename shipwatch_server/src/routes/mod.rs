use axum::Router;

pub mod config;
pub mod health;
pub mod orders;
pub mod status;
pub mod tracking;

#[tracing::instrument(level = "debug", skip_all)]
pub fn router() -> Router {
    Router::new().nest(
        "/api",
        Router::new()
            .merge(orders::router())
            .merge(tracking::router())
            .merge(config::router())
            .merge(status::router()),
    )
}
