use crate::{
    availability::overlaps,
    backend::BookingBackend,
    error::StoreError,
    types::{BlockedTime, Booking, NewBlockedTime, NewBooking},
};
use chrono::{DateTime, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Debug, Default)]
struct Tables {
    bookings: HashMap<i32, Booking>,
    blocked_times: HashMap<i32, BlockedTime>,
    last_booking_id: i32,
    last_blocked_time_id: i32,
}

/// Impersistent backend, used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct LocalBookings {
    tables: Arc<Mutex<Tables>>,
}

impl LocalBookings {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Query("Local booking store is poisoned".into()))
    }
}

fn sorted_bookings<'a>(bookings: impl Iterator<Item = &'a Booking>) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = bookings.cloned().collect();
    bookings.sort_unstable_by_key(|booking| booking.date_time);
    bookings
}

fn sorted_blocked_times<'a>(blocked: impl Iterator<Item = &'a BlockedTime>) -> Vec<BlockedTime> {
    let mut blocked: Vec<BlockedTime> = blocked.cloned().collect();
    blocked.sort_unstable_by_key(|blocked| (blocked.start_time, blocked.id));
    blocked
}

impl BookingBackend for LocalBookings {
    fn bookings(&self) -> Result<Vec<Booking>, StoreError> {
        Ok(sorted_bookings(self.lock()?.bookings.values()))
    }

    fn bookings_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let tables = self.lock()?;
        Ok(sorted_bookings(tables.bookings.values().filter(|booking| {
            booking.date_time >= start && booking.date_time < end
        })))
    }

    fn booking(&self, id: i32) -> Result<Option<Booking>, StoreError> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    fn booking_at(&self, date_time: DateTime<Utc>) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .find(|booking| booking.date_time == date_time)
            .cloned())
    }

    fn add_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let mut tables = self.lock()?;
        // Same guarantee as the UNIQUE column in the database backend
        if tables
            .bookings
            .values()
            .any(|existing| existing.date_time == booking.date_time)
        {
            return Err(StoreError::Duplicate);
        }

        tables.last_booking_id += 1;
        let booking = Booking {
            id: tables.last_booking_id,
            client_name: booking.client_name,
            email: booking.email,
            phone: booking.phone,
            reason: booking.reason,
            date_time: booking.date_time,
            notes: None,
            created_at: booking.created_at,
        };
        tables.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    fn update_notes(&self, id: i32, notes: Option<String>) -> Result<Option<Booking>, StoreError> {
        let mut tables = self.lock()?;
        Ok(tables.bookings.get_mut(&id).map(|booking| {
            booking.notes = notes;
            booking.clone()
        }))
    }

    fn remove_booking(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.lock()?.bookings.remove(&id).is_some())
    }

    fn blocked_times(&self) -> Result<Vec<BlockedTime>, StoreError> {
        Ok(sorted_blocked_times(self.lock()?.blocked_times.values()))
    }

    fn blocked_times_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BlockedTime>, StoreError> {
        let tables = self.lock()?;
        Ok(sorted_blocked_times(tables.blocked_times.values().filter(
            |blocked| overlaps(start, end, blocked.start_time, blocked.end_time),
        )))
    }

    fn add_blocked_time(&self, blocked_time: NewBlockedTime) -> Result<BlockedTime, StoreError> {
        let mut tables = self.lock()?;
        tables.last_blocked_time_id += 1;
        let blocked_time = BlockedTime {
            id: tables.last_blocked_time_id,
            start_time: blocked_time.start_time,
            end_time: blocked_time.end_time,
            reason: blocked_time.reason,
            created_at: blocked_time.created_at,
        };
        tables
            .blocked_times
            .insert(blocked_time.id, blocked_time.clone());
        Ok(blocked_time)
    }

    fn remove_blocked_time(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.lock()?.blocked_times.remove(&id).is_some())
    }
}
