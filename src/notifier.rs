//! Email notification for admin notes on a booking.
//!
//! Delivery goes through the Resend HTTP API. Callers treat every failure as
//! non-fatal.

use crate::error::NotificationError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::debug;

const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";
const NOTES_SUBJECT: &str = "Update on Your Training Consultation";

/// A note the admin left on a booking, addressed to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesMessage {
    pub to: String,
    pub client_name: String,
    pub booking_time: DateTime<Utc>,
    pub notes: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send_notes(&self, message: NotesMessage) -> Result<(), NotificationError>;
}

/// e.g. "Monday, June 10, 2024 at 9:00 AM"
pub fn format_booking_time(booking_time: DateTime<Utc>, timezone: &Tz) -> String {
    booking_time
        .with_timezone(timezone)
        .format("%A, %B %-d, %Y at %-I:%M %p")
        .to_string()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

pub fn render_notes_email(message: &NotesMessage, timezone: &Tz) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Hi {name},</h2>
  <p>You have a new note regarding your consultation scheduled for:</p>
  <p><strong>{time}</strong></p>
  <div>
    <p><strong>Note from your trainer:</strong></p>
    <p>{notes}</p>
  </div>
  <p>If you have any questions, feel free to reply to this email.</p>
</div>"#,
        name = escape_html(&message.client_name),
        time = format_booking_time(message.booking_time, timezone),
        notes = escape_html(&message.notes),
    )
}

#[derive(Debug, Serialize)]
struct ResendEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

pub struct ResendNotifier {
    client: reqwest::Client,
    api_key: String,
    from_email: String,
    endpoint: String,
    timezone: Tz,
}

impl ResendNotifier {
    pub fn new(api_key: String, from_email: String, timezone: Tz) -> Self {
        Self::with_endpoint(api_key, from_email, timezone, RESEND_EMAILS_URL.into())
    }

    pub fn with_endpoint(api_key: String, from_email: String, timezone: Tz, endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            from_email,
            endpoint,
            timezone,
        }
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    async fn send_notes(&self, message: NotesMessage) -> Result<(), NotificationError> {
        let email = ResendEmail {
            from: &self.from_email,
            to: [&message.to],
            subject: NOTES_SUBJECT,
            html: render_notes_email(&message, &self.timezone),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(to = %message.to, "Notes notification sent");
        Ok(())
    }
}
