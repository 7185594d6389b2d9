//! Rutas HTTP
//!
//! Cada recurso expone su router; `create_router` los monta bajo `/api`.

pub mod auth_routes;
pub mod boat_routes;
pub mod booking_routes;
pub mod payment_routes;

use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth_routes::create_auth_router(state.clone()))
        .nest("/api/boats", boat_routes::create_boat_router(state.clone()))
        .nest(
            "/api/bookings",
            booking_routes::create_booking_router(state.clone()),
        )
        .nest("/api/payments", payment_routes::create_payment_router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
