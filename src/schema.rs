diesel::table! {
    bookings (id) {
        id -> Integer,
        client_name -> Text,
        email -> Text,
        phone -> Text,
        reason -> Text,
        date_time -> Timestamp,
        notes -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    blocked_times (id) {
        id -> Integer,
        start_time -> Timestamp,
        end_time -> Timestamp,
        reason -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

pub const CREATE_TABLES: &str = "
CREATE TABLE IF NOT EXISTS bookings (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    client_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT NOT NULL,
    reason TEXT NOT NULL,
    date_time TIMESTAMP NOT NULL UNIQUE,
    notes TEXT,
    created_at TIMESTAMP NOT NULL
);
CREATE TABLE IF NOT EXISTS blocked_times (
    id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
    start_time TIMESTAMP NOT NULL,
    end_time TIMESTAMP NOT NULL CHECK (end_time > start_time),
    reason TEXT,
    created_at TIMESTAMP NOT NULL
);
CREATE INDEX IF NOT EXISTS blocked_times_start_time ON blocked_times (start_time);
";
