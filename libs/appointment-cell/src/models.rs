// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use payment_cell::models::{CarePlan, PaymentMethod};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked consultation slot. `preferred_date` is the clinic-local date key
/// that partitions slot availability; `slot_start`/`slot_end` are the absolute
/// instants of the assigned interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub preferred_date: NaiveDate,
    pub concern: String,
    pub plan: CarePlan,
    /// 1-based position among the date's bookings at creation time. Display
    /// ordering only; conflict detection always goes through the intervals.
    pub patient_number: i32,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// True when this booking's interval overlaps `[start, end)`.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.slot_end && end > self.slot_start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Slot chosen by the allocator, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocatedSlot {
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
    pub patient_number: i32,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub name: String,
    pub phone: String,
    /// Clinic-local `YYYY-MM-DD`; longer strings are truncated to the date
    /// part. Omitted means "today" in the clinic timezone.
    pub preferred_date: Option<String>,
    pub concern: Option<String>,
    pub plan: Option<CarePlan>,
    // Optional payment details recorded alongside the booking.
    pub method: Option<PaymentMethod>,
    pub amount: Option<f64>,
    pub txn_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub concern: Option<String>,
    pub plan: Option<CarePlan>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("No free slot remains in the service window")]
    SlotsExhausted,

    #[error("Slot was taken by a concurrent booking")]
    SlotConflict,

    #[error("Appointment not found")]
    NotFound,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Appointment cannot change status from {0}")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
