use crate::error::{BookingError, StoreError};
use chrono::{DateTime, Duration, Utc};
use constant_time_eq::constant_time_eq;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tracing::{info, warn};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "admin_token";
pub const SESSION_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Issued admin session tokens and their expiry.
#[derive(Debug, Clone)]
pub struct AdminSessions {
    credentials: Option<AdminCredentials>,
    tokens: Arc<Mutex<HashMap<String, DateTime<Utc>>>>,
}

impl AdminSessions {
    pub fn new(credentials: Option<AdminCredentials>) -> Self {
        if credentials.is_none() {
            warn!("No admin credentials configured, admin login is disabled");
        }
        Self {
            credentials,
            tokens: Arc::default(),
        }
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        match &self.credentials {
            Some(credentials) => {
                let username_matches =
                    constant_time_eq(credentials.username.as_bytes(), username.as_bytes());
                let password_matches =
                    constant_time_eq(credentials.password.as_bytes(), password.as_bytes());
                username_matches & password_matches
            }
            None => false,
        }
    }

    /// Checks the credentials and opens a session valid for [`SESSION_DAYS`].
    pub fn login(&self, username: &str, password: &str, now: DateTime<Utc>) -> Result<String, BookingError> {
        if username.is_empty() || password.is_empty() {
            return Err(BookingError::validation("Username and password are required"));
        }
        if !self.verify(username, password) {
            warn!(username, "Rejected admin login");
            return Err(BookingError::unauthorized("Invalid credentials"));
        }

        let token = Uuid::new_v4().simple().to_string();
        let mut tokens = self.tokens.lock().map_err(|_| poisoned())?;
        tokens.retain(|_, expires_at| *expires_at > now);
        tokens.insert(token.clone(), now + Duration::days(SESSION_DAYS));
        info!("Admin logged in");
        Ok(token)
    }

    pub fn is_valid(&self, token: &str, now: DateTime<Utc>) -> bool {
        match self.tokens.lock() {
            Ok(tokens) => tokens
                .get(token)
                .is_some_and(|expires_at| *expires_at > now),
            Err(_) => false,
        }
    }

    pub fn logout(&self, token: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.remove(token);
        }
    }
}

fn poisoned() -> BookingError {
    StoreError::Query("Session store is poisoned".into()).into()
}
