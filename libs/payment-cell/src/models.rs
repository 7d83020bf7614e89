// libs/payment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE PAYMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub amount: f64,
    pub plan: CarePlan,
    pub method: PaymentMethod,
    pub name: Option<String>,
    pub phone: Option<String>,
    /// Clinic wallet the patient is asked to transfer to. Sourced from
    /// configuration; absent when the deployment has not set one.
    pub target_wallet_number: Option<String>,
    pub transaction_id: Option<String>,
    pub appointment_id: Option<Uuid>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Consultation plan a booking is billed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarePlan {
    Basic,
    Premium,
}

impl CarePlan {
    /// Standard fee in PKR when the caller did not quote an amount.
    pub fn default_amount(&self) -> f64 {
        match self {
            CarePlan::Basic => 600.0,
            CarePlan::Premium => 1000.0,
        }
    }
}

impl Default for CarePlan {
    fn default() -> Self {
        CarePlan::Basic
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Jazzcash,
    Sadapay,
    Nayapay,
    Credit,
    Debit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub amount: f64,
    pub plan: CarePlan,
    pub method: PaymentMethod,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub transaction_id: Option<String>,
    pub appointment_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePaymentRequest {
    pub status: Option<PaymentStatus>,
    pub transaction_id: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment not found")]
    NotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
