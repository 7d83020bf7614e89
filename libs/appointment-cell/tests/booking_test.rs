// libs/appointment-cell/tests/booking_test.rs
//
// Booking flow tests over the in-memory store: allocation consistency,
// retry-on-conflict, lifecycle rules.

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Duration;

use appointment_cell::models::{
    AppointmentError, AppointmentStatus, BookAppointmentRequest, UpdateAppointmentRequest,
};
use appointment_cell::services::booking::AppointmentBookingService;
use appointment_cell::services::store::{BookingStore, InMemoryBookingStore};

// A date far enough out that the same-day buffer rule never applies.
const TARGET_DATE: &str = "2030-01-01";

fn service() -> (AppointmentBookingService, Arc<InMemoryBookingStore>) {
    let store = Arc::new(InMemoryBookingStore::new());
    (AppointmentBookingService::with_store(store.clone()), store)
}

fn booking_request(name: &str) -> BookAppointmentRequest {
    BookAppointmentRequest {
        name: name.to_string(),
        phone: "03001234567".to_string(),
        preferred_date: Some(TARGET_DATE.to_string()),
        concern: Some("Skin rash".to_string()),
        plan: None,
        method: None,
        amount: None,
        txn_id: None,
    }
}

#[tokio::test]
async fn first_booking_gets_window_start_slot() {
    let (service, _) = service();

    let appointment = service.book_appointment(booking_request("Ahmed Khan")).await.unwrap();

    assert_eq!(appointment.patient_number, 1);
    assert_eq!(appointment.status, AppointmentStatus::Pending);
    assert_eq!(appointment.slot_end - appointment.slot_start, Duration::minutes(15));
    // 19:00 clinic time (UTC+5) is 14:00 UTC.
    assert_eq!(appointment.slot_start.to_rfc3339(), "2030-01-01T14:00:00+00:00");
}

#[tokio::test]
async fn successive_bookings_never_share_an_interval() {
    let (service, _) = service();

    let mut seen = Vec::new();
    for i in 0..12 {
        let appointment = service
            .book_appointment(booking_request(&format!("Patient {}", i)))
            .await
            .unwrap();

        assert!(
            seen.iter().all(|&(start, end)| {
                appointment.slot_start >= end || appointment.slot_end <= start
            }),
            "slot {} overlaps an earlier booking",
            appointment.slot_start
        );
        seen.push((appointment.slot_start, appointment.slot_end));
    }
}

#[tokio::test]
async fn thirteenth_booking_is_rejected() {
    let (service, _) = service();

    for i in 0..12 {
        service
            .book_appointment(booking_request(&format!("Patient {}", i)))
            .await
            .unwrap();
    }

    let result = service.book_appointment(booking_request("One too many")).await;
    assert_matches!(result, Err(AppointmentError::SlotsExhausted));
}

#[tokio::test]
async fn concurrent_bookings_land_on_distinct_slots() {
    let store = Arc::new(InMemoryBookingStore::new());
    let first = Arc::new(AppointmentBookingService::with_store(store.clone()));
    let second = first.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move { first.book_appointment(booking_request("Ahmed Khan")).await }),
        tokio::spawn(async move { second.book_appointment(booking_request("Sara Ali")).await }),
    );

    let a = a.unwrap().unwrap();
    let b = b.unwrap().unwrap();

    assert_ne!(a.slot_start, b.slot_start);
    assert!(a.slot_start >= b.slot_end || a.slot_end <= b.slot_start);
}

#[tokio::test]
async fn duplicate_interval_insert_is_rejected_by_the_store() {
    let (service, store) = service();

    let appointment = service.book_appointment(booking_request("Ahmed Khan")).await.unwrap();

    // A second record for the identical interval, as a racing request that
    // computed from the same snapshot would produce.
    let mut duplicate = appointment.clone();
    duplicate.id = uuid::Uuid::new_v4();
    duplicate.name = "Sara Ali".to_string();

    let result = store.insert(&duplicate).await;
    assert_matches!(result, Err(AppointmentError::SlotConflict));
}

#[tokio::test]
async fn cancelled_booking_keeps_its_slot_occupied() {
    let (service, _) = service();

    let first = service.book_appointment(booking_request("Ahmed Khan")).await.unwrap();

    let cancel = UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Cancelled),
        ..Default::default()
    };
    service.update_appointment(first.id, cancel).await.unwrap();

    let second = service.book_appointment(booking_request("Sara Ali")).await.unwrap();

    assert_ne!(second.slot_start, first.slot_start);
    assert!(second.slot_start >= first.slot_end);
}

#[tokio::test]
async fn delete_does_not_compact_patient_numbers() {
    let (service, _) = service();

    let first = service.book_appointment(booking_request("Ahmed Khan")).await.unwrap();
    let second = service.book_appointment(booking_request("Sara Ali")).await.unwrap();
    let third = service.book_appointment(booking_request("Fatima Noor")).await.unwrap();
    assert_eq!((first.patient_number, second.patient_number, third.patient_number), (1, 2, 3));

    service.delete_appointment(second.id).await.unwrap();

    // Two bookings remain; the next one is numbered from the remaining count.
    let fourth = service.book_appointment(booking_request("Usman Malik")).await.unwrap();
    assert_eq!(fourth.patient_number, 3);

    // The survivors keep their original numbers.
    let third_again = service.get_appointment(third.id).await.unwrap();
    assert_eq!(third_again.patient_number, 3);
}

#[tokio::test]
async fn status_transitions_are_validated() {
    let (service, _) = service();

    let appointment = service.book_appointment(booking_request("Ahmed Khan")).await.unwrap();

    let confirm = UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Confirmed),
        ..Default::default()
    };
    let confirmed = service.update_appointment(appointment.id, confirm).await.unwrap();
    assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

    let complete = UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Completed),
        ..Default::default()
    };
    service.update_appointment(appointment.id, complete).await.unwrap();

    // Completed is terminal.
    let back_to_pending = UpdateAppointmentRequest {
        status: Some(AppointmentStatus::Pending),
        ..Default::default()
    };
    let result = service.update_appointment(appointment.id, back_to_pending).await;
    assert_matches!(result, Err(AppointmentError::InvalidStatusTransition(_)));
}

#[tokio::test]
async fn contact_updates_never_move_the_slot() {
    let (service, _) = service();

    let appointment = service.book_appointment(booking_request("Ahmed Khan")).await.unwrap();

    let update = UpdateAppointmentRequest {
        phone: Some("03331234567".to_string()),
        concern: Some("Digestive issues".to_string()),
        ..Default::default()
    };
    let updated = service.update_appointment(appointment.id, update).await.unwrap();

    assert_eq!(updated.phone, "03331234567");
    assert_eq!(updated.slot_start, appointment.slot_start);
    assert_eq!(updated.patient_number, appointment.patient_number);
}

#[tokio::test]
async fn blank_name_or_phone_is_rejected() {
    let (service, _) = service();

    let mut request = booking_request("  ");
    let result = service.book_appointment(request).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));

    request = booking_request("Ahmed Khan");
    request.phone = "not-a-number".to_string();
    let result = service.book_appointment(request).await;
    assert_matches!(result, Err(AppointmentError::ValidationError(_)));
}

#[tokio::test]
async fn malformed_date_is_rejected() {
    let (service, _) = service();

    let mut request = booking_request("Ahmed Khan");
    request.preferred_date = Some("next tuesday".to_string());

    let result = service.book_appointment(request).await;
    assert_matches!(result, Err(AppointmentError::InvalidDate(_)));
}

#[tokio::test]
async fn date_listing_is_ordered_by_slot() {
    let (service, _) = service();

    for i in 0..3 {
        service
            .book_appointment(booking_request(&format!("Patient {}", i)))
            .await
            .unwrap();
    }

    let listed = service.list_appointments_for_date(TARGET_DATE).await.unwrap();

    assert_eq!(listed.len(), 3);
    assert!(listed.windows(2).all(|pair| pair[0].slot_start < pair[1].slot_start));
}
