pub mod allocation;
pub mod booking;
pub mod calendar;
pub mod lifecycle;
pub mod store;

pub use allocation::{ClinicSchedule, SlotAllocator};
pub use booking::AppointmentBookingService;
pub use calendar::ClinicCalendar;
pub use lifecycle::AppointmentLifecycleService;
pub use store::{BookingStore, InMemoryBookingStore, SupabaseBookingStore};
