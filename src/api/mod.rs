//! REST boundary over the planning pipeline and history store.

pub mod error;
pub mod handlers;
pub mod models;

use std::any::Any as PanicPayload;
use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::persistence::HistoryStore;
use crate::pipeline::Orchestrator;

pub use error::{ApiError, ErrorResponse};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn HistoryStore>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route(
            "/api/recommendations/generate",
            post(handlers::generate_recommendation),
        )
        .route("/api/farm-context/{user_id}", get(handlers::get_farm_context))
        .route(
            "/api/recommendations/history/{user_id}",
            get(handlers::get_recommendation_history),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Turns a handler panic into the usual JSON error body.
fn handle_panic(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    ApiError::Internal(detail).into_response()
}

pub async fn run_server(state: AppState, bind_address: &str) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("🌐 Planner API listening on http://{}", bind_address);
    axum::serve(listener, app).await?;
    Ok(())
}
