// libs/payment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

pub fn payment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(handlers::list_payments))
        .route("/", post(handlers::create_payment))
        .route("/{payment_id}", get(handlers::get_payment))
        .route("/{payment_id}", patch(handlers::update_payment))
        .route("/{payment_id}", delete(handlers::delete_payment))
        .with_state(state)
}
