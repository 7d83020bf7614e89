use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use appointment_cell::router::appointment_routes;
use payment_cell::router::payment_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route(
            "/",
            get(|| async { Json(json!({ "status": "ok", "message": "Clinic booking API is running" })) }),
        )
        .nest("/api/appointments", appointment_routes(state.clone()))
        .nest("/api/payments", payment_routes(state.clone()))
}
