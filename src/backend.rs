use crate::error::StoreError;
use crate::types::{BlockedTime, Booking, NewBlockedTime, NewBooking};
use chrono::{DateTime, Utc};

/// Storage for bookings and blocked time.
///
/// Listings come back ascending by `date_time` / `start_time`. Implementations
/// must reject a second booking at an already booked instant with
/// [`StoreError::Duplicate`], even when two inserts race.
pub trait BookingBackend: Clone + Send + Sync + 'static {
    fn bookings(&self) -> Result<Vec<Booking>, StoreError>;
    /// Bookings with `start <= date_time < end`.
    fn bookings_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;
    fn booking(&self, id: i32) -> Result<Option<Booking>, StoreError>;
    fn booking_at(&self, date_time: DateTime<Utc>) -> Result<Option<Booking>, StoreError>;
    fn add_booking(&self, booking: NewBooking) -> Result<Booking, StoreError>;
    /// Returns `None` when no booking has this id.
    fn update_notes(&self, id: i32, notes: Option<String>) -> Result<Option<Booking>, StoreError>;
    /// Returns `false` when no booking has this id.
    fn remove_booking(&self, id: i32) -> Result<bool, StoreError>;

    fn blocked_times(&self) -> Result<Vec<BlockedTime>, StoreError>;
    /// Blocked ranges sharing at least one instant with `[start, end)`.
    fn blocked_times_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BlockedTime>, StoreError>;
    fn add_blocked_time(&self, blocked_time: NewBlockedTime) -> Result<BlockedTime, StoreError>;
    /// Returns `false` when no blocked range has this id.
    fn remove_blocked_time(&self, id: i32) -> Result<bool, StoreError>;
}
