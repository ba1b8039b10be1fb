use crate::{
    availability::{classify, overlaps, SlotStatus},
    backend::BookingBackend,
    block_request::{out_of_range, BlockKind},
    calendar::{enumerate_slots, is_slot_start, is_supported_instant, local_instant, week_start_for_offset, Slot, WorkingHours, DAYS_PER_WEEK},
    error::{BookingError, StoreError},
    notifier::{NotesMessage, Notifier},
    types::{BlockedTime, Booking, NewBlockedTime, NewBooking},
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

/// Wire form of `POST /bookings`. Every field is required; absent, null and
/// blank values are all reported the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[validate(required, length(min = 1))]
    pub client_name: Option<String>,
    #[validate(required, length(min = 1))]
    pub email: Option<String>,
    #[validate(required, length(min = 1))]
    pub phone: Option<String>,
    #[validate(required, length(min = 1))]
    pub reason: Option<String>,
    /// RFC 3339 instant, parsed after the presence check.
    #[validate(required, length(min = 1))]
    pub date_time: Option<String>,
}

fn trim(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string())
}

impl BookingRequest {
    fn trimmed(self) -> Self {
        Self {
            client_name: trim(self.client_name),
            email: trim(self.email),
            phone: trim(self.phone),
            reason: trim(self.reason),
            date_time: trim(self.date_time),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingScope {
    #[default]
    All,
    Upcoming,
    Past,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: Slot,
    pub status: SlotStatus,
    pub reservable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekCalendar {
    pub week_offset: i64,
    pub week_start: NaiveDate,
    pub slots: Vec<SlotView>,
}

/// Reservation, blocked time and notes handling on top of a backend.
#[derive(Clone)]
pub struct BookingManager<T: BookingBackend> {
    backend: T,
    notifier: Option<Arc<dyn Notifier>>,
    working_hours: WorkingHours,
    timezone: Tz,
}

impl<T: BookingBackend> BookingManager<T> {
    pub fn new(backend: T, working_hours: WorkingHours, timezone: Tz) -> Self {
        Self {
            backend,
            notifier: None,
            working_hours,
            timezone,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn bookings(&self, scope: BookingScope, now: DateTime<Utc>) -> Result<Vec<Booking>, BookingError> {
        let bookings = self.backend.bookings()?;
        Ok(match scope {
            BookingScope::All => bookings,
            BookingScope::Upcoming => bookings
                .into_iter()
                .filter(|booking| booking.date_time >= now)
                .collect(),
            BookingScope::Past => bookings
                .into_iter()
                .filter(|booking| booking.date_time < now)
                .collect(),
        })
    }

    pub fn booking(&self, id: i32) -> Result<Booking, BookingError> {
        self.backend
            .booking(id)?
            .ok_or_else(|| BookingError::not_found("Booking not found"))
    }

    /// Validates against the current store state and persists the booking.
    pub fn reserve(&self, request: BookingRequest, now: DateTime<Utc>) -> Result<Booking, BookingError> {
        let request = request.trimmed();
        let (Ok(()), Some(client_name), Some(email), Some(phone), Some(reason), Some(date_time)) = (
            request.validate(),
            request.client_name,
            request.email,
            request.phone,
            request.reason,
            request.date_time,
        ) else {
            return Err(BookingError::validation("All fields are required"));
        };
        let date_time: DateTime<Utc> = date_time
            .parse()
            .map_err(|_| BookingError::validation("Invalid date and time"))?;

        if !is_supported_instant(date_time) {
            return Err(out_of_range());
        }
        if !is_slot_start(date_time, self.working_hours, &self.timezone) {
            return Err(BookingError::validation(
                "Bookings must start on the hour within working hours",
            ));
        }
        if date_time < now {
            return Err(BookingError::validation("This time slot is in the past"));
        }

        if self.backend.booking_at(date_time)?.is_some() {
            return Err(BookingError::conflict("This time slot is already booked"));
        }
        let slot_end = date_time + Duration::hours(1);
        if !self
            .backend
            .blocked_times_overlapping(date_time, slot_end)?
            .is_empty()
        {
            return Err(BookingError::conflict("This time slot is unavailable"));
        }

        let booking = self
            .backend
            .add_booking(NewBooking {
                client_name,
                email,
                phone,
                reason,
                date_time,
                created_at: now,
            })
            .map_err(|err| match err {
                // Lost a race against a concurrent reservation
                StoreError::Duplicate => BookingError::conflict("This time slot is already booked"),
                err => err.into(),
            })?;

        info!(id = booking.id, date_time = %booking.date_time, "Booking created");
        Ok(booking)
    }

    /// Stores the notes and, when they are non-empty, notifies the client.
    /// Notification failures are logged and never fail the update.
    pub async fn update_notes(&self, id: i32, notes: Option<String>) -> Result<Booking, BookingError> {
        let notes = notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());

        let booking = self
            .backend
            .update_notes(id, notes)?
            .ok_or_else(|| BookingError::not_found("Booking not found"))?;
        info!(id, "Booking notes updated");

        if let (Some(notifier), Some(notes)) = (&self.notifier, &booking.notes) {
            let message = NotesMessage {
                to: booking.email.clone(),
                client_name: booking.client_name.clone(),
                booking_time: booking.date_time,
                notes: notes.clone(),
            };
            if let Err(err) = notifier.send_notes(message).await {
                warn!(id, ?err, "Failed to send notes notification");
            }
        }

        Ok(booking)
    }

    pub fn cancel_booking(&self, id: i32) -> Result<(), BookingError> {
        if !self.backend.remove_booking(id)? {
            return Err(BookingError::not_found("Booking not found"));
        }
        info!(id, "Booking cancelled");
        Ok(())
    }

    pub fn blocked_times(&self) -> Result<Vec<BlockedTime>, BookingError> {
        Ok(self.backend.blocked_times()?)
    }

    /// Blocks the derived range. Existing bookings inside it are left alone.
    pub fn create_block(
        &self,
        kind: &BlockKind,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<BlockedTime, BookingError> {
        let (start_time, end_time) = kind.interval(self.working_hours, &self.timezone)?;
        let reason = reason
            .map(|reason| reason.trim().to_string())
            .filter(|reason| !reason.is_empty());

        let blocked_time = self.backend.add_blocked_time(NewBlockedTime {
            start_time,
            end_time,
            reason,
            created_at: now,
        })?;

        // A booking starting up to an hour before the block still overlaps it
        let window_start = start_time
            .checked_sub_signed(Duration::hours(1))
            .unwrap_or(start_time);
        let affected = self
            .backend
            .bookings_between(window_start, end_time)?
            .into_iter()
            .filter(|booking| {
                overlaps(
                    booking.date_time,
                    booking.date_time + Duration::hours(1),
                    start_time,
                    end_time,
                )
            })
            .count();
        if affected > 0 {
            warn!(id = blocked_time.id, affected, "Blocked time overlaps existing bookings");
        }
        info!(id = blocked_time.id, %start_time, %end_time, "Blocked time created");
        Ok(blocked_time)
    }

    pub fn delete_block(&self, id: i32) -> Result<(), BookingError> {
        if !self.backend.remove_blocked_time(id)? {
            return Err(BookingError::not_found("Blocked time not found"));
        }
        info!(id, "Blocked time removed");
        Ok(())
    }

    /// Classified slots of one week. `horizon` is the largest week offset the
    /// caller may look at. Booking ids are only reported with `with_booking_ids`.
    pub fn week(
        &self,
        now: DateTime<Utc>,
        week_offset: i64,
        horizon: u32,
        with_booking_ids: bool,
    ) -> Result<WeekCalendar, BookingError> {
        if !(0..=horizon as i64).contains(&week_offset) {
            return Err(BookingError::validation(format!(
                "Week offset must be between 0 and {horizon}"
            )));
        }

        let week_start = week_start_for_offset(now, week_offset, &self.timezone);
        let window_start = local_instant(&self.timezone, week_start, 0);
        let window_end = local_instant(
            &self.timezone,
            week_start + Duration::days(DAYS_PER_WEEK),
            0,
        );
        let bookings = self.backend.bookings_between(window_start, window_end)?;
        let blocked_times = self
            .backend
            .blocked_times_overlapping(window_start, window_end)?;

        let slots = enumerate_slots(now, week_offset, self.working_hours, self.timezone)
            .map(|slot| {
                let status = classify(&slot, &bookings, &blocked_times, now);
                SlotView {
                    status,
                    reservable: status.is_reservable(),
                    booking_id: bookings
                        .iter()
                        .find(|booking| with_booking_ids && booking.date_time == slot.start)
                        .map(|booking| booking.id),
                    slot,
                }
            })
            .collect();

        Ok(WeekCalendar {
            week_offset,
            week_start,
            slots,
        })
    }
}
