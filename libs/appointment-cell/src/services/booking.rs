// libs/appointment-cell/src/services/booking.rs
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use payment_cell::models::CreatePaymentRequest;
use payment_cell::services::PaymentService;
use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, BookAppointmentRequest, UpdateAppointmentRequest,
};
use crate::services::allocation::SlotAllocator;
use crate::services::calendar::ClinicCalendar;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::store::{BookingStore, SupabaseBookingStore};

/// One retry after a storage-level slot conflict, then the failure surfaces.
const MAX_ALLOCATION_ATTEMPTS: u32 = 2;

pub struct AppointmentBookingService {
    store: Arc<dyn BookingStore>,
    calendar: ClinicCalendar,
    allocator: SlotAllocator,
    lifecycle: AppointmentLifecycleService,
    payments: Option<PaymentService>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::assemble(
            Arc::new(SupabaseBookingStore::new(config)),
            Some(PaymentService::new(config)),
        )
    }

    /// Build against an explicit store, with no payment recording. Used by
    /// tests and by deployments running the in-memory store.
    pub fn with_store(store: Arc<dyn BookingStore>) -> Self {
        Self::assemble(store, None)
    }

    fn assemble(store: Arc<dyn BookingStore>, payments: Option<PaymentService>) -> Self {
        let calendar = ClinicCalendar::new();
        let allocator = SlotAllocator::new(calendar.offset());

        Self {
            store,
            calendar,
            allocator,
            lifecycle: AppointmentLifecycleService::new(),
            payments,
        }
    }

    /// Book the next free slot on the requested date.
    ///
    /// Each attempt reads the date's bookings fresh and computes a candidate
    /// from that snapshot. The store rejects a candidate taken by a
    /// concurrent request with `SlotConflict`; the first conflict re-runs
    /// the read-allocate-insert cycle once, a second one is surfaced. No
    /// record is written when allocation fails.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        self.validate_booking_request(&request)?;

        let date_key = self.calendar.resolve_date_key(request.preferred_date.as_deref())?;
        info!("Booking appointment for {} on {}", request.name, date_key);

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            let existing = self.store.bookings_for_date(date_key).await?;
            let slot = self
                .allocator
                .allocate(date_key, &existing, self.calendar.today(), self.calendar.now())?;

            let now = self.calendar.now();
            let appointment = Appointment {
                id: Uuid::new_v4(),
                name: request.name.trim().to_string(),
                phone: request.phone.trim().to_string(),
                preferred_date: date_key,
                concern: request.concern.clone().unwrap_or_default(),
                plan: request.plan.unwrap_or_default(),
                patient_number: slot.patient_number,
                slot_start: slot.slot_start,
                slot_end: slot.slot_end,
                status: AppointmentStatus::Pending,
                created_at: now,
                updated_at: now,
            };

            match self.store.insert(&appointment).await {
                Ok(created) => {
                    info!(
                        "Appointment {} booked: patient number {} at {}",
                        created.id, created.patient_number, created.slot_start
                    );
                    self.record_booking_payment(&created, &request).await;
                    return Ok(created);
                }
                Err(AppointmentError::SlotConflict) if attempt < MAX_ALLOCATION_ATTEMPTS => {
                    warn!(
                        "Slot {} on {} was taken concurrently, retrying with a fresh read",
                        appointment.slot_start, date_key
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppointmentError::SlotConflict)
    }

    pub async fn get_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);
        self.store.fetch(appointment_id).await
    }

    /// All appointments, newest first.
    pub async fn list_appointments(&self) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.list_all().await
    }

    /// The requested date's appointments in slot order.
    pub async fn list_appointments_for_date(
        &self,
        raw_date: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let date_key = self.calendar.resolve_date_key(Some(raw_date))?;
        self.store.bookings_for_date(date_key).await
    }

    /// Apply contact/status changes. Never re-runs slot logic: a cancelled
    /// booking keeps its interval occupied.
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Updating appointment: {}", appointment_id);

        let current = self.store.fetch(appointment_id).await?;

        if let Some(new_status) = request.status {
            self.lifecycle.validate_status_transition(current.status, new_status)?;
        }

        let updated = self.store.update(appointment_id, &request).await?;

        info!("Appointment {} updated", appointment_id);
        Ok(updated)
    }

    /// Delete a booking. Remaining patient numbers are not compacted and the
    /// freed interval is not offered to any allocation already in flight.
    pub async fn delete_appointment(&self, appointment_id: Uuid) -> Result<Appointment, AppointmentError> {
        debug!("Deleting appointment: {}", appointment_id);
        self.store.delete(appointment_id).await
    }

    fn validate_booking_request(&self, request: &BookAppointmentRequest) -> Result<(), AppointmentError> {
        if request.name.trim().is_empty() || request.phone.trim().is_empty() {
            return Err(AppointmentError::ValidationError(
                "Name and phone are required".to_string(),
            ));
        }

        let phone_regex = Regex::new(r"^0\d{9,10}$").unwrap();
        if !phone_regex.is_match(request.phone.trim()) {
            return Err(AppointmentError::ValidationError(
                "Phone must be a local mobile number".to_string(),
            ));
        }

        Ok(())
    }

    /// Record a pending payment next to a fresh booking when the request
    /// carried payment details. A failure here is logged and never fails the
    /// booking itself.
    async fn record_booking_payment(&self, appointment: &Appointment, request: &BookAppointmentRequest) {
        let payments = match &self.payments {
            Some(payments) => payments,
            None => return,
        };

        let (plan, method) = match (request.plan, request.method, request.amount) {
            (Some(plan), Some(method), Some(_)) => (plan, method),
            _ => return,
        };

        let amount = request
            .amount
            .filter(|a| *a > 0.0)
            .unwrap_or_else(|| plan.default_amount());

        let payment_request = CreatePaymentRequest {
            amount,
            plan,
            method,
            name: Some(appointment.name.clone()),
            phone: Some(appointment.phone.clone()),
            transaction_id: request.txn_id.clone(),
            appointment_id: Some(appointment.id),
        };

        if let Err(e) = payments.record_payment(payment_request).await {
            warn!("Payment creation failed for appointment {}: {}", appointment.id, e);
        }
    }
}
