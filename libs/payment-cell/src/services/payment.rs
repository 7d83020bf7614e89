// libs/payment-cell/src/services/payment.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{DatabaseError, SupabaseClient};

use crate::models::{CreatePaymentRequest, Payment, PaymentError, PaymentStatus, UpdatePaymentRequest};

pub struct PaymentService {
    supabase: Arc<SupabaseClient>,
    wallet_number: Option<String>,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Self {
        let wallet_number = if config.is_payment_collection_configured() {
            Some(config.payment_wallet_number.clone())
        } else {
            None
        };

        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            wallet_number,
        }
    }

    /// Create a payment via the public API. When the request names an
    /// appointment, the appointment must exist.
    pub async fn create_payment(&self, request: CreatePaymentRequest) -> Result<Payment, PaymentError> {
        debug!("Creating payment of {} via {:?}", request.amount, request.method);

        if request.amount <= 0.0 {
            return Err(PaymentError::ValidationError(
                "Payment amount must be positive".to_string(),
            ));
        }

        if let Some(appointment_id) = request.appointment_id {
            self.verify_appointment_exists(appointment_id).await?;
        }

        self.record_payment(request).await
    }

    /// Insert a payment record without the appointment lookup. Used by the
    /// booking flow, which has just created the appointment itself.
    pub async fn record_payment(&self, request: CreatePaymentRequest) -> Result<Payment, PaymentError> {
        let payment = Payment {
            id: Uuid::new_v4(),
            amount: request.amount,
            plan: request.plan,
            method: request.method,
            name: request.name,
            phone: request.phone,
            target_wallet_number: self.wallet_number.clone(),
            transaction_id: request.transaction_id,
            appointment_id: request.appointment_id,
            status: PaymentStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let payment_data = serde_json::to_value(&payment)
            .map_err(|e| PaymentError::DatabaseError(format!("Failed to serialize payment: {}", e)))?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::POST, "/rest/v1/payments", Some(payment_data), Some(headers))
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PaymentError::DatabaseError("Failed to create payment".to_string()));
        }

        let created: Payment = serde_json::from_value(result[0].clone())
            .map_err(|e| PaymentError::DatabaseError(format!("Failed to parse payment: {}", e)))?;

        info!("Payment {} recorded with status {:?}", created.id, created.status);
        Ok(created)
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Payment, PaymentError> {
        debug!("Fetching payment: {}", payment_id);

        let path = format!("/rest/v1/payments?id=eq.{}", payment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PaymentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PaymentError::DatabaseError(format!("Failed to parse payment: {}", e)))
    }

    /// All payments, newest first.
    pub async fn list_payments(&self) -> Result<Vec<Payment>, PaymentError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/payments?order=created_at.desc", None)
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Payment>, _>>()
            .map_err(|e| PaymentError::DatabaseError(format!("Failed to parse payments: {}", e)))
    }

    /// Only the payment status and transaction id may change after creation.
    pub async fn update_payment(
        &self,
        payment_id: Uuid,
        request: UpdatePaymentRequest,
    ) -> Result<Payment, PaymentError> {
        debug!("Updating payment: {}", payment_id);

        let mut update_data = serde_json::Map::new();

        if let Some(status) = request.status {
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(transaction_id) = request.transaction_id {
            update_data.insert("transaction_id".to_string(), json!(transaction_id));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/payments?id=eq.{}", payment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::PATCH, &path, Some(Value::Object(update_data)), Some(headers))
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PaymentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PaymentError::DatabaseError(format!("Failed to parse payment: {}", e)))
    }

    /// Delete a payment and return the removed record.
    pub async fn delete_payment(&self, payment_id: Uuid) -> Result<Payment, PaymentError> {
        debug!("Deleting payment: {}", payment_id);

        let path = format!("/rest/v1/payments?id=eq.{}", payment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(headers))
            .await
            .map_err(|e| PaymentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(PaymentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| PaymentError::DatabaseError(format!("Failed to parse payment: {}", e)))
    }

    async fn verify_appointment_exists(&self, appointment_id: Uuid) -> Result<(), PaymentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&select=id", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => PaymentError::AppointmentNotFound,
                other => PaymentError::DatabaseError(other.to_string()),
            })?;

        if result.is_empty() {
            return Err(PaymentError::AppointmentNotFound);
        }

        Ok(())
    }
}
