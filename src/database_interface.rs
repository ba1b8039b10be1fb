use crate::schema::{blocked_times, bookings, CREATE_TABLES};
use crate::{
    backend::BookingBackend,
    error::StoreError,
    types::{BlockedTime, Booking, NewBlockedTime, NewBooking},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct BookingRow {
    id: i32,
    client_name: String,
    email: String,
    phone: String,
    reason: String,
    date_time: NaiveDateTime,
    notes: Option<String>,
    created_at: NaiveDateTime,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            client_name: row.client_name,
            email: row.email,
            phone: row.phone,
            reason: row.reason,
            date_time: row.date_time.and_utc(),
            notes: row.notes,
            created_at: row.created_at.and_utc(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = bookings)]
struct NewBookingRow<'a> {
    client_name: &'a str,
    email: &'a str,
    phone: &'a str,
    reason: &'a str,
    date_time: NaiveDateTime,
    created_at: NaiveDateTime,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = blocked_times)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct BlockedTimeRow {
    id: i32,
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    reason: Option<String>,
    created_at: NaiveDateTime,
}

impl From<BlockedTimeRow> for BlockedTime {
    fn from(row: BlockedTimeRow) -> Self {
        BlockedTime {
            id: row.id,
            start_time: row.start_time.and_utc(),
            end_time: row.end_time.and_utc(),
            reason: row.reason,
            created_at: row.created_at.and_utc(),
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = blocked_times)]
struct NewBlockedTimeRow<'a> {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    reason: Option<&'a str>,
    created_at: NaiveDateTime,
}

/// SQLite backend. Instants are stored as naive UTC timestamps.
#[derive(Clone)]
pub struct DatabaseInterface {
    connection: Arc<Mutex<SqliteConnection>>,
}

impl DatabaseInterface {
    pub fn new(database_url: &str) -> Result<Self, StoreError> {
        let mut connection = Self::establish_connection(database_url)?;
        connection
            .batch_execute(CREATE_TABLES)
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        debug!(database_url, "Database schema ready");

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    fn establish_connection(database_url: &str) -> Result<SqliteConnection, StoreError> {
        Ok(SqliteConnection::establish(database_url)?)
    }

    fn connection(&self) -> Result<MutexGuard<'_, SqliteConnection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::Connection("Database connection is poisoned".into()))
    }
}

impl BookingBackend for DatabaseInterface {
    fn bookings(&self) -> Result<Vec<Booking>, StoreError> {
        let mut connection = self.connection()?;
        let rows = bookings::table
            .order(bookings::date_time.asc())
            .select(BookingRow::as_select())
            .load(&mut *connection)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    fn bookings_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        let mut connection = self.connection()?;
        let rows = bookings::table
            .filter(bookings::date_time.ge(start.naive_utc()))
            .filter(bookings::date_time.lt(end.naive_utc()))
            .order(bookings::date_time.asc())
            .select(BookingRow::as_select())
            .load(&mut *connection)?;
        Ok(rows.into_iter().map(Booking::from).collect())
    }

    fn booking(&self, id: i32) -> Result<Option<Booking>, StoreError> {
        let mut connection = self.connection()?;
        let row = bookings::table
            .find(id)
            .select(BookingRow::as_select())
            .first(&mut *connection)
            .optional()?;
        Ok(row.map(Booking::from))
    }

    fn booking_at(&self, date_time: DateTime<Utc>) -> Result<Option<Booking>, StoreError> {
        let mut connection = self.connection()?;
        let row = bookings::table
            .filter(bookings::date_time.eq(date_time.naive_utc()))
            .select(BookingRow::as_select())
            .first(&mut *connection)
            .optional()?;
        Ok(row.map(Booking::from))
    }

    fn add_booking(&self, booking: NewBooking) -> Result<Booking, StoreError> {
        let mut connection = self.connection()?;
        let row = NewBookingRow {
            client_name: &booking.client_name,
            email: &booking.email,
            phone: &booking.phone,
            reason: &booking.reason,
            date_time: booking.date_time.naive_utc(),
            created_at: booking.created_at.naive_utc(),
        };

        let inserted = diesel::insert_into(bookings::table)
            .values(&row)
            .returning(BookingRow::as_returning())
            .get_result(&mut *connection)?;
        Ok(inserted.into())
    }

    fn update_notes(&self, id: i32, notes: Option<String>) -> Result<Option<Booking>, StoreError> {
        let mut connection = self.connection()?;
        let updated = diesel::update(bookings::table.find(id))
            .set(bookings::notes.eq(notes))
            .returning(BookingRow::as_returning())
            .get_result(&mut *connection)
            .optional()?;
        Ok(updated.map(Booking::from))
    }

    fn remove_booking(&self, id: i32) -> Result<bool, StoreError> {
        let mut connection = self.connection()?;
        let deleted = diesel::delete(bookings::table.find(id)).execute(&mut *connection)?;
        Ok(deleted > 0)
    }

    fn blocked_times(&self) -> Result<Vec<BlockedTime>, StoreError> {
        let mut connection = self.connection()?;
        let rows = blocked_times::table
            .order((blocked_times::start_time.asc(), blocked_times::id.asc()))
            .select(BlockedTimeRow::as_select())
            .load(&mut *connection)?;
        Ok(rows.into_iter().map(BlockedTime::from).collect())
    }

    fn blocked_times_overlapping(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BlockedTime>, StoreError> {
        let mut connection = self.connection()?;
        let rows = blocked_times::table
            .filter(blocked_times::start_time.lt(end.naive_utc()))
            .filter(blocked_times::end_time.gt(start.naive_utc()))
            .order((blocked_times::start_time.asc(), blocked_times::id.asc()))
            .select(BlockedTimeRow::as_select())
            .load(&mut *connection)?;
        Ok(rows.into_iter().map(BlockedTime::from).collect())
    }

    fn add_blocked_time(&self, blocked_time: NewBlockedTime) -> Result<BlockedTime, StoreError> {
        let mut connection = self.connection()?;
        let row = NewBlockedTimeRow {
            start_time: blocked_time.start_time.naive_utc(),
            end_time: blocked_time.end_time.naive_utc(),
            reason: blocked_time.reason.as_deref(),
            created_at: blocked_time.created_at.naive_utc(),
        };

        let inserted = diesel::insert_into(blocked_times::table)
            .values(&row)
            .returning(BlockedTimeRow::as_returning())
            .get_result(&mut *connection)?;
        Ok(inserted.into())
    }

    fn remove_blocked_time(&self, id: i32) -> Result<bool, StoreError> {
        let mut connection = self.connection()?;
        let deleted =
            diesel::delete(blocked_times::table.find(id)).execute(&mut *connection)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod test {
    //! Runs against in-memory and temporary-file SQLite databases, no server needed.

    use super::*;
    use crate::testutils::{new_blocked_time, new_booking, utc};

    const TEST_DATABASE_URL: &str = ":memory:";

    #[test]
    fn test_add_update_remove_single_booking() {
        let database_interface = DatabaseInterface::new(TEST_DATABASE_URL).unwrap();
        assert_eq!(database_interface.bookings().unwrap().len(), 0);

        let booking = database_interface
            .add_booking(new_booking("Stefan", "2024-06-10T09:00:00Z"))
            .unwrap();
        assert_eq!(booking.client_name, "Stefan");
        assert_eq!(booking.email, "stefan@example.com");
        assert_eq!(booking.date_time, utc("2024-06-10T09:00:00Z"));
        assert_eq!(booking.notes, None);

        let current_bookings = database_interface.bookings().unwrap();
        assert_eq!(current_bookings, vec![booking.clone()]);

        let updated = database_interface
            .update_notes(booking.id, Some("Bring water".into()))
            .unwrap()
            .unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Bring water"));

        let cleared = database_interface
            .update_notes(booking.id, None)
            .unwrap()
            .unwrap();
        assert_eq!(cleared.notes, None);

        assert!(database_interface.remove_booking(booking.id).unwrap());
        assert!(database_interface.bookings().unwrap().is_empty());
        assert!(!database_interface.remove_booking(booking.id).unwrap());
        assert!(database_interface
            .update_notes(booking.id, None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unique_date_time() {
        let database_interface = DatabaseInterface::new(TEST_DATABASE_URL).unwrap();
        database_interface
            .add_booking(new_booking("Stefan", "2024-06-10T09:00:00Z"))
            .unwrap();

        let err = database_interface
            .add_booking(new_booking("Peter", "2024-06-10T09:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate));
        assert_eq!(database_interface.bookings().unwrap().len(), 1);
    }

    #[test]
    fn test_lookups_and_ordering() {
        let database_interface = DatabaseInterface::new(TEST_DATABASE_URL).unwrap();
        database_interface
            .add_booking(new_booking("Late", "2024-06-12T15:00:00Z"))
            .unwrap();
        let early = database_interface
            .add_booking(new_booking("Early", "2024-06-10T08:00:00Z"))
            .unwrap();

        let names: Vec<String> = database_interface
            .bookings()
            .unwrap()
            .into_iter()
            .map(|booking| booking.client_name)
            .collect();
        assert_eq!(names, vec!["Early", "Late"]);

        assert_eq!(database_interface.booking(early.id).unwrap(), Some(early.clone()));
        assert_eq!(
            database_interface
                .booking_at(utc("2024-06-10T08:00:00Z"))
                .unwrap(),
            Some(early)
        );
        assert!(database_interface.booking(9999).unwrap().is_none());

        let window = database_interface
            .bookings_between(utc("2024-06-10T00:00:00Z"), utc("2024-06-12T15:00:00Z"))
            .unwrap();
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_blocked_times() {
        let database_interface = DatabaseInterface::new(TEST_DATABASE_URL).unwrap();
        let mut first = new_blocked_time("2024-06-12T08:00:00Z", "2024-06-12T17:00:00Z");
        first.reason = Some("Vacation".into());
        database_interface.add_blocked_time(first).unwrap();
        let second = database_interface
            .add_blocked_time(new_blocked_time("2024-06-10T08:00:00Z", "2024-06-10T10:00:00Z"))
            .unwrap();

        let blocked = database_interface.blocked_times().unwrap();
        assert_eq!(blocked.len(), 2);
        assert_eq!(blocked[0], second);
        assert_eq!(blocked[1].reason.as_deref(), Some("Vacation"));

        let overlapping = database_interface
            .blocked_times_overlapping(utc("2024-06-10T09:00:00Z"), utc("2024-06-10T10:00:00Z"))
            .unwrap();
        assert_eq!(overlapping, vec![second.clone()]);
        assert!(database_interface
            .blocked_times_overlapping(utc("2024-06-10T10:00:00Z"), utc("2024-06-10T11:00:00Z"))
            .unwrap()
            .is_empty());

        assert!(!database_interface.remove_blocked_time(9999).unwrap());
        assert!(database_interface.remove_blocked_time(second.id).unwrap());
        assert_eq!(database_interface.blocked_times().unwrap().len(), 1);
    }

    #[test]
    fn test_database_persistency() {
        let directory = tempfile::tempdir().unwrap();
        let database_url = directory.path().join("bookings.db");
        let database_url = database_url.to_str().unwrap();

        let database_interface = DatabaseInterface::new(database_url).unwrap();
        database_interface
            .add_booking(new_booking("Stefan", "2024-06-10T09:00:00Z"))
            .unwrap();
        database_interface
            .add_blocked_time(new_blocked_time("2024-06-10T12:00:00Z", "2024-06-10T13:00:00Z"))
            .unwrap();
        drop(database_interface);

        let database_interface = DatabaseInterface::new(database_url).unwrap();
        assert_eq!(database_interface.bookings().unwrap().len(), 1);
        assert_eq!(database_interface.blocked_times().unwrap().len(), 1);

        // The unique constraint survives reopening
        assert!(matches!(
            database_interface.add_booking(new_booking("Peter", "2024-06-10T09:00:00Z")),
            Err(StoreError::Duplicate)
        ));
    }
}
