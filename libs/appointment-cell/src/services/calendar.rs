// libs/appointment-cell/src/services/calendar.rs
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::models::AppointmentError;

/// Clinic timezone offset from UTC, in hours (PKT).
pub const CLINIC_UTC_OFFSET_HOURS: i32 = 5;

/// Resolves "now" and "today" in the fixed clinic timezone, so slot
/// computation never depends on the host machine's zone.
#[derive(Debug, Clone, Copy)]
pub struct ClinicCalendar {
    offset: FixedOffset,
}

impl ClinicCalendar {
    pub fn new() -> Self {
        Self {
            offset: FixedOffset::east_opt(CLINIC_UTC_OFFSET_HOURS * 3600).unwrap(),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Current wall-clock instant.
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// The clinic-local date of the current instant.
    pub fn today(&self) -> NaiveDate {
        self.date_key_at(Utc::now())
    }

    /// Clinic-local date of an arbitrary instant.
    pub fn date_key_at(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Resolve an optional requested date to a concrete date key.
    ///
    /// An explicit value is trusted to be clinic-local: it is truncated to
    /// its first ten characters and parsed as `YYYY-MM-DD`, with no timezone
    /// conversion. An omitted value means clinic-local today.
    pub fn resolve_date_key(&self, requested: Option<&str>) -> Result<NaiveDate, AppointmentError> {
        match requested {
            Some(raw) => {
                let head: String = raw.chars().take(10).collect();
                NaiveDate::parse_from_str(&head, "%Y-%m-%d")
                    .map_err(|_| AppointmentError::InvalidDate(raw.to_string()))
            }
            None => Ok(self.today()),
        }
    }
}

impl Default for ClinicCalendar {
    fn default() -> Self {
        Self::new()
    }
}
