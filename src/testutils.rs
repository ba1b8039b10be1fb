use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use chrono::{DateTime, Utc};
use chrono_tz::{Tz, UTC};

use crate::{
    backend::BookingBackend,
    calendar::WorkingHours,
    configuration::Configuration,
    error::StoreError,
    local_bookings::LocalBookings,
    session::AdminCredentials,
    types::{BlockedTime, Booking, NewBlockedTime, NewBooking},
};

pub const TEST_ADMIN_USERNAME: &str = "admin";
pub const TEST_ADMIN_PASSWORD: &str = "123";

pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

pub fn new_booking(client_name: &str, date_time: &str) -> NewBooking {
    NewBooking {
        client_name: client_name.into(),
        email: format!("{}@example.com", client_name.to_lowercase()),
        phone: "555-0100".into(),
        reason: "General fitness".into(),
        date_time: utc(date_time),
        created_at: utc("2024-06-01T00:00:00Z"),
    }
}

pub fn new_blocked_time(start_time: &str, end_time: &str) -> NewBlockedTime {
    NewBlockedTime {
        start_time: utc(start_time),
        end_time: utc(end_time),
        reason: None,
        created_at: utc("2024-06-01T00:00:00Z"),
    }
}

#[derive(Clone)]
pub struct TestConfiguration;

impl Configuration for TestConfiguration {
    fn port(&self) -> String {
        "0".into()
    }

    fn database_url(&self) -> Option<String> {
        None
    }

    fn admin_credentials(&self) -> Option<AdminCredentials> {
        Some(AdminCredentials {
            username: TEST_ADMIN_USERNAME.into(),
            password: TEST_ADMIN_PASSWORD.into(),
        })
    }

    fn notification_api_key(&self) -> Option<String> {
        None
    }

    fn from_email(&self) -> String {
        "Bookings <bookings@example.com>".into()
    }

    fn timezone(&self) -> Tz {
        UTC
    }

    fn working_hours(&self) -> WorkingHours {
        WorkingHours::default()
    }

    fn public_week_horizon(&self) -> u32 {
        1
    }

    fn admin_week_horizon(&self) -> u32 {
        2
    }

    fn secure_cookies(&self) -> bool {
        false
    }
}

/// Counts backend calls and can be told to fail. Successful calls are served
/// by an in-memory store.
pub struct MockBookingBackendInner {
    pub success: AtomicBool,
    pub duplicate_on_insert: AtomicBool,
    pub calls_to_bookings: AtomicU64,
    pub calls_to_add_booking: AtomicU64,
    pub calls_to_update_notes: AtomicU64,
    pub calls_to_remove_booking: AtomicU64,
    pub calls_to_blocked_times: AtomicU64,
    pub calls_to_add_blocked_time: AtomicU64,
    pub calls_to_remove_blocked_time: AtomicU64,
    pub store: LocalBookings,
}

#[derive(Clone)]
pub struct MockBookingBackend(pub Arc<MockBookingBackendInner>);

impl MockBookingBackendInner {
    fn new() -> Self {
        Self {
            success: AtomicBool::new(true),
            duplicate_on_insert: AtomicBool::new(false),
            calls_to_bookings: AtomicU64::default(),
            calls_to_add_booking: AtomicU64::default(),
            calls_to_update_notes: AtomicU64::default(),
            calls_to_remove_booking: AtomicU64::default(),
            calls_to_blocked_times: AtomicU64::default(),
            calls_to_add_blocked_time: AtomicU64::default(),
            calls_to_remove_blocked_time: AtomicU64::default(),
            store: LocalBookings::default(),
        }
    }
}

impl MockBookingBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockBookingBackendInner::new()))
    }

    fn result(&self) -> Result<(), StoreError> {
        match self.0.success.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err(StoreError::Query("Supposed to fail".into())),
        }
    }
}

impl BookingBackend for MockBookingBackend {
    fn bookings(&self) -> Result<Vec<Booking>, StoreError> {
        self.0.calls_to_bookings.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.bookings()
    }

    fn bookings_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        self.result()?;
        self.0.store.bookings_between(start, end)
    }

    fn booking(&self, id: i32) -> Result<Option<Booking>, StoreError> {
        self.result()?;
        self.0.store.booking(id)
    }

    fn booking_at(&self, date_time: DateTime<Utc>) -> Result<Option<Booking>, StoreError> {
        self.result()?;
        self.0.store.booking_at(date_time)
    }

    fn add_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        self.0.calls_to_add_booking.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        if self.0.duplicate_on_insert.load(Ordering::SeqCst) {
            return Err(StoreError::Duplicate);
        }
        self.0.store.add_booking(booking)
    }

    fn update_notes(&self, id: i32, notes: Option<String>) -> Result<Option<Booking>, StoreError> {
        self.0.calls_to_update_notes.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.update_notes(id, notes)
    }

    fn remove_booking(&self, id: i32) -> Result<bool, StoreError> {
        self.0
            .calls_to_remove_booking
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.remove_booking(id)
    }

    fn blocked_times(&self) -> Result<Vec<BlockedTime>, StoreError> {
        self.0.calls_to_blocked_times.fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.blocked_times()
    }

    fn blocked_times_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BlockedTime>, StoreError> {
        self.result()?;
        self.0.store.blocked_times_overlapping(start, end)
    }

    fn add_blocked_time(&self, blocked_time: NewBlockedTime) -> Result<BlockedTime, StoreError> {
        self.0
            .calls_to_add_blocked_time
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.add_blocked_time(blocked_time)
    }

    fn remove_blocked_time(&self, id: i32) -> Result<bool, StoreError> {
        self.0
            .calls_to_remove_blocked_time
            .fetch_add(1, Ordering::SeqCst);
        self.result()?;
        self.0.store.remove_blocked_time(id)
    }
}
