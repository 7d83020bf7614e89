// libs/appointment-cell/src/services/allocation.rs
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{debug, warn};

use crate::models::{AllocatedSlot, Appointment, AppointmentError};

/// Daily service window and slot sizing. The window length must be an exact
/// multiple of the slot duration for `capacity` to be precise.
#[derive(Debug, Clone)]
pub struct ClinicSchedule {
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub slot_minutes: i64,
    /// Minimum lead time before a same-day slot may start.
    pub same_day_buffer_minutes: i64,
}

impl Default for ClinicSchedule {
    fn default() -> Self {
        Self {
            window_start: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            window_end: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            slot_minutes: 15,
            same_day_buffer_minutes: 5,
        }
    }
}

impl ClinicSchedule {
    /// Number of slots that fit in the window: (22:00 - 19:00) / 15min = 12.
    pub fn capacity(&self) -> usize {
        let window = self.window_end - self.window_start;
        (window.num_minutes() / self.slot_minutes) as usize
    }
}

/// Computes the next free slot for a date from a snapshot of that date's
/// existing bookings. Pure: the caller supplies the snapshot, today's date
/// key, and the current instant; persistence belongs to the storage
/// collaborator.
pub struct SlotAllocator {
    schedule: ClinicSchedule,
    offset: FixedOffset,
}

impl SlotAllocator {
    pub fn new(offset: FixedOffset) -> Self {
        Self::with_schedule(ClinicSchedule::default(), offset)
    }

    pub fn with_schedule(schedule: ClinicSchedule, offset: FixedOffset) -> Self {
        Self { schedule, offset }
    }

    pub fn capacity(&self) -> usize {
        self.schedule.capacity()
    }

    /// Find the earliest interval in `date_key`'s window that overlaps none
    /// of the existing bookings.
    ///
    /// Bookings of every status count as occupied: a cancelled slot stays
    /// spent. On the current day the scan starts no earlier than
    /// `now + buffer`, so a slot that has effectively elapsed is never
    /// handed out.
    pub fn allocate(
        &self,
        date_key: NaiveDate,
        existing: &[Appointment],
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<AllocatedSlot, AppointmentError> {
        debug!(
            "Allocating slot on {} against {} existing bookings",
            date_key,
            existing.len()
        );

        if existing.len() >= self.schedule.capacity() {
            warn!("Booking capacity reached for {}", date_key);
            return Err(AppointmentError::SlotsExhausted);
        }

        let window_start = self.clinic_instant(date_key, self.schedule.window_start);
        let window_end = self.clinic_instant(date_key, self.schedule.window_end);
        let slot = Duration::minutes(self.schedule.slot_minutes);

        let mut cursor = window_start;
        if date_key == today {
            let earliest = now + Duration::minutes(self.schedule.same_day_buffer_minutes);
            if earliest > cursor {
                cursor = earliest;
            }
        }

        while cursor + slot <= window_end {
            let candidate_end = cursor + slot;
            let occupied = existing.iter().any(|booking| booking.overlaps(cursor, candidate_end));

            if !occupied {
                return Ok(AllocatedSlot {
                    slot_start: cursor,
                    slot_end: candidate_end,
                    patient_number: existing.len() as i32 + 1,
                });
            }

            cursor += slot;
        }

        warn!("No free interval left in the window for {}", date_key);
        Err(AppointmentError::SlotsExhausted)
    }

    /// A clinic-local time on `date` as an absolute instant.
    fn clinic_instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        self.offset
            .from_local_datetime(&date.and_time(time))
            .unwrap()
            .with_timezone(&Utc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use crate::services::calendar::ClinicCalendar;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn allocator() -> SlotAllocator {
        SlotAllocator::new(ClinicCalendar::new().offset())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Absolute instant for a clinic-local time on the given date.
    fn clinic_time(d: NaiveDate, h: u32, mi: u32) -> DateTime<Utc> {
        ClinicCalendar::new()
            .offset()
            .from_local_datetime(&d.and_time(NaiveTime::from_hms_opt(h, mi, 0).unwrap()))
            .unwrap()
            .with_timezone(&Utc)
    }

    fn booking(d: NaiveDate, h: u32, mi: u32, number: i32) -> Appointment {
        let start = clinic_time(d, h, mi);
        Appointment {
            id: Uuid::new_v4(),
            name: "Ahmed Khan".to_string(),
            phone: "03001234567".to_string(),
            preferred_date: d,
            concern: String::new(),
            plan: Default::default(),
            patient_number: number,
            slot_start: start,
            slot_end: start + Duration::minutes(15),
            status: AppointmentStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // A "not today" reference so the buffer rule stays out of the way.
    fn other_day() -> (NaiveDate, DateTime<Utc>) {
        (date(2024, 2, 28), clinic_time(date(2024, 2, 28), 12, 0))
    }

    #[test]
    fn empty_day_gets_window_start() {
        let target = date(2024, 3, 1);
        let (today, now) = other_day();

        let slot = allocator().allocate(target, &[], today, now).unwrap();

        assert_eq!(slot.slot_start, clinic_time(target, 19, 0));
        assert_eq!(slot.slot_end, clinic_time(target, 19, 15));
        assert_eq!(slot.patient_number, 1);
    }

    #[test]
    fn next_free_interval_after_existing_bookings() {
        let target = date(2024, 3, 1);
        let (today, now) = other_day();
        let existing = vec![booking(target, 19, 0, 1), booking(target, 19, 15, 2)];

        let slot = allocator().allocate(target, &existing, today, now).unwrap();

        assert_eq!(slot.slot_start, clinic_time(target, 19, 30));
        assert_eq!(slot.patient_number, 3);
    }

    #[test]
    fn gap_between_bookings_is_filled_first() {
        let target = date(2024, 3, 1);
        let (today, now) = other_day();
        // 19:15 free between two occupied slots.
        let existing = vec![booking(target, 19, 0, 1), booking(target, 19, 30, 2)];

        let slot = allocator().allocate(target, &existing, today, now).unwrap();

        assert_eq!(slot.slot_start, clinic_time(target, 19, 15));
    }

    #[test]
    fn cancelled_booking_still_occupies_its_interval() {
        let target = date(2024, 3, 1);
        let (today, now) = other_day();
        let mut cancelled = booking(target, 19, 0, 1);
        cancelled.status = AppointmentStatus::Cancelled;

        let slot = allocator().allocate(target, &[cancelled], today, now).unwrap();

        assert_eq!(slot.slot_start, clinic_time(target, 19, 15));
    }

    #[test]
    fn full_day_by_count_is_exhausted() {
        let target = date(2024, 3, 1);
        let (today, now) = other_day();
        let existing: Vec<_> = (0..12)
            .map(|i| booking(target, 19 + (i / 4) as u32, ((i % 4) * 15) as u32, i + 1))
            .collect();

        let result = allocator().allocate(target, &existing, today, now);

        assert_matches!(result, Err(AppointmentError::SlotsExhausted));
    }

    #[test]
    fn no_time_fit_is_exhausted_even_below_capacity() {
        let target = date(2024, 3, 1);
        // Fewer than 12 bookings, but it is today and 21:50 local: the
        // buffered cursor leaves no room for a full slot before 22:00.
        let now = clinic_time(target, 21, 50);

        let result = allocator().allocate(target, &[booking(target, 19, 0, 1)], target, now);

        assert_matches!(result, Err(AppointmentError::SlotsExhausted));
    }

    #[test]
    fn same_day_slot_respects_buffer() {
        let target = date(2024, 3, 1);
        let now = clinic_time(target, 20, 7);

        let slot = allocator().allocate(target, &[], target, now).unwrap();

        // 20:07 + 5-minute buffer: nothing may start before 20:12.
        assert_eq!(slot.slot_start, clinic_time(target, 20, 12));
    }

    #[test]
    fn same_day_before_window_still_starts_at_window() {
        let target = date(2024, 3, 1);
        let now = clinic_time(target, 10, 0);

        let slot = allocator().allocate(target, &[], target, now).unwrap();

        assert_eq!(slot.slot_start, clinic_time(target, 19, 0));
    }

    #[test]
    fn successive_allocations_never_overlap_and_stay_in_window() {
        let target = date(2024, 3, 1);
        let (today, now) = other_day();
        let allocator = allocator();
        let window_start = clinic_time(target, 19, 0);
        let window_end = clinic_time(target, 22, 0);

        let mut existing: Vec<Appointment> = Vec::new();
        for round in 0..allocator.capacity() as i32 {
            let slot = allocator.allocate(target, &existing, today, now).unwrap();

            assert!(slot.slot_start >= window_start);
            assert!(slot.slot_end <= window_end);
            assert_eq!(slot.slot_end - slot.slot_start, Duration::minutes(15));
            assert!(existing.iter().all(|b| !b.overlaps(slot.slot_start, slot.slot_end)));

            let mut next = booking(target, 19, 0, round + 1);
            next.slot_start = slot.slot_start;
            next.slot_end = slot.slot_end;
            existing.push(next);
        }

        assert_matches!(
            allocator.allocate(target, &existing, today, now),
            Err(AppointmentError::SlotsExhausted)
        );
    }
}
