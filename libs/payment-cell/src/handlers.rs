// libs/payment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CreatePaymentRequest, PaymentError, UpdatePaymentRequest};
use crate::services::PaymentService;

fn map_payment_error(e: PaymentError) -> AppError {
    match e {
        PaymentError::NotFound => AppError::NotFound("Payment not found".to_string()),
        PaymentError::AppointmentNotFound => AppError::NotFound("Appointment not found".to_string()),
        PaymentError::ValidationError(msg) => AppError::BadRequest(msg),
        PaymentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn create_payment(
    State(config): State<Arc<AppConfig>>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&config);

    let payment = service.create_payment(request).await.map_err(map_payment_error)?;

    Ok(Json(json!({
        "success": true,
        "payment": payment,
        "message": "Payment recorded successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_payment(
    State(config): State<Arc<AppConfig>>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&config);

    let payment = service.get_payment(payment_id).await.map_err(map_payment_error)?;

    Ok(Json(json!(payment)))
}

#[axum::debug_handler]
pub async fn list_payments(
    State(config): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&config);

    let payments = service.list_payments().await.map_err(map_payment_error)?;

    Ok(Json(json!({
        "success": true,
        "count": payments.len(),
        "payments": payments
    })))
}

#[axum::debug_handler]
pub async fn update_payment(
    State(config): State<Arc<AppConfig>>,
    Path(payment_id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&config);

    let payment = service
        .update_payment(payment_id, request)
        .await
        .map_err(map_payment_error)?;

    Ok(Json(json!({
        "success": true,
        "payment": payment,
        "message": "Payment updated successfully"
    })))
}

#[axum::debug_handler]
pub async fn delete_payment(
    State(config): State<Arc<AppConfig>>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&config);

    let payment = service.delete_payment(payment_id).await.map_err(map_payment_error)?;

    Ok(Json(json!({
        "success": true,
        "payment": payment,
        "message": "Payment deleted"
    })))
}
