// libs/appointment-cell/src/services/store.rs
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{DatabaseError, SupabaseClient};

use crate::models::{Appointment, AppointmentError, UpdateAppointmentRequest};

/// Storage collaborator for bookings. The booking flow owns an explicit
/// handle to one of these; nothing here is process-global.
///
/// `insert` is the serialization point for concurrent allocation: an insert
/// whose interval overlaps an existing booking on the same date MUST be
/// rejected with `SlotConflict`, so that of two racing requests exactly one
/// succeeds and the other re-reads.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Every booking recorded for the date, by slot start. Read fresh for
    /// each allocation attempt; implementations must not cache.
    async fn bookings_for_date(&self, date_key: NaiveDate) -> Result<Vec<Appointment>, AppointmentError>;

    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError>;

    async fn fetch(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError>;

    /// All bookings, newest first.
    async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError>;

    async fn update(
        &self,
        appointment_id: Uuid,
        changes: &UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError>;

    /// Remove a booking and return the removed record. The freed interval is
    /// not reclaimed by any in-flight allocation.
    async fn delete(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError>;
}

// ==============================================================================
// SUPABASE-BACKED STORE
// ==============================================================================

/// REST-backed store. Relies on a unique index on
/// `(preferred_date, slot_start)` in the appointments table; the 409 it
/// produces under a race surfaces here as `SlotConflict`.
pub struct SupabaseBookingStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseBookingStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));
        headers
    }

    fn parse_rows(rows: Vec<Value>) -> Result<Vec<Appointment>, AppointmentError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }
}

#[async_trait]
impl BookingStore for SupabaseBookingStore {
    async fn bookings_for_date(&self, date_key: NaiveDate) -> Result<Vec<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?preferred_date=eq.{}&order=slot_start.asc",
            date_key
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::parse_rows(result)
    }

    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let body = serde_json::to_value(appointment)
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to serialize appointment: {}", e)))?;

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(body),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| match e {
                DatabaseError::Conflict(_) => AppointmentError::SlotConflict,
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        if result.is_empty() {
            return Err(AppointmentError::DatabaseError(
                "Failed to create appointment".to_string(),
            ));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    async fn fetch(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, "/rest/v1/appointments?order=created_at.desc", None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        Self::parse_rows(result)
    }

    async fn update(
        &self,
        appointment_id: Uuid,
        changes: &UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let mut update_data = serde_json::Map::new();

        if let Some(status) = changes.status {
            update_data.insert("status".to_string(), json!(status));
        }
        if let Some(ref name) = changes.name {
            update_data.insert("name".to_string(), json!(name));
        }
        if let Some(ref phone) = changes.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }
        if let Some(ref concern) = changes.concern {
            update_data.insert("concern".to_string(), json!(concern));
        }
        if let Some(plan) = changes.plan {
            update_data.insert("plan".to_string(), json!(plan));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(Value::Object(update_data)),
                Some(Self::representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(Method::DELETE, &path, None, Some(Self::representation_headers()))
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}

// ==============================================================================
// IN-MEMORY STORE
// ==============================================================================

/// Mutex-guarded store holding the bookings in process memory. The overlap
/// check runs under the lock, which makes `insert` a per-date critical
/// section. An instance is injected where it is used; there is no global.
#[derive(Default)]
pub struct InMemoryBookingStore {
    bookings: Mutex<Vec<Appointment>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn bookings_for_date(&self, date_key: NaiveDate) -> Result<Vec<Appointment>, AppointmentError> {
        let bookings = self.bookings.lock().await;

        let mut on_date: Vec<Appointment> = bookings
            .iter()
            .filter(|b| b.preferred_date == date_key)
            .cloned()
            .collect();
        on_date.sort_by_key(|b| b.slot_start);

        Ok(on_date)
    }

    async fn insert(&self, appointment: &Appointment) -> Result<Appointment, AppointmentError> {
        let mut bookings = self.bookings.lock().await;

        let taken = bookings.iter().any(|b| {
            b.preferred_date == appointment.preferred_date
                && b.overlaps(appointment.slot_start, appointment.slot_end)
        });
        if taken {
            debug!(
                "Rejecting booking on {}: interval already taken",
                appointment.preferred_date
            );
            return Err(AppointmentError::SlotConflict);
        }

        bookings.push(appointment.clone());
        Ok(appointment.clone())
    }

    async fn fetch(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let bookings = self.bookings.lock().await;

        bookings
            .iter()
            .find(|b| b.id == appointment_id)
            .cloned()
            .ok_or(AppointmentError::NotFound)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>, AppointmentError> {
        let bookings = self.bookings.lock().await;

        let mut all: Vec<Appointment> = bookings.clone();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(all)
    }

    async fn update(
        &self,
        appointment_id: Uuid,
        changes: &UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        let mut bookings = self.bookings.lock().await;

        let booking = bookings
            .iter_mut()
            .find(|b| b.id == appointment_id)
            .ok_or(AppointmentError::NotFound)?;

        if let Some(status) = changes.status {
            booking.status = status;
        }
        if let Some(ref name) = changes.name {
            booking.name = name.clone();
        }
        if let Some(ref phone) = changes.phone {
            booking.phone = phone.clone();
        }
        if let Some(ref concern) = changes.concern {
            booking.concern = concern.clone();
        }
        if let Some(plan) = changes.plan {
            booking.plan = plan;
        }
        booking.updated_at = Utc::now();

        Ok(booking.clone())
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        let mut bookings = self.bookings.lock().await;

        let position = bookings
            .iter()
            .position(|b| b.id == appointment_id)
            .ok_or(AppointmentError::NotFound)?;

        Ok(bookings.remove(position))
    }
}
