use crate::calendar::WorkingHours;
use crate::configuration::Configuration;
use crate::session::AdminCredentials;
use chrono_tz::Tz;
use clap::Parser;
use tracing::warn;

fn parse_timezone(value: &str) -> Result<Tz, String> {
    value.parse::<Tz>().map_err(|err| err.to_string())
}

/// Command line arguments, each falling back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "booking_calendar", about = "Booking calendar for a personal trainer")]
pub struct ConfigurationHandler {
    #[arg(long, env = "PORT", default_value = "3000")]
    port: String,

    /// SQLite database file. Without it bookings are kept in memory only.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, env = "ADMIN_USERNAME")]
    admin_username: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    admin_password: Option<String>,

    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    resend_api_key: Option<String>,

    #[arg(long, env = "FROM_EMAIL", default_value = "Bookings <onboarding@resend.dev>")]
    from_email: String,

    /// IANA name of the zone slots and blocks are laid out in.
    #[arg(long, env = "TIMEZONE", default_value = "UTC", value_parser = parse_timezone)]
    timezone: Tz,

    #[arg(long, env = "OPENING_HOUR", default_value_t = 8, value_parser = clap::value_parser!(u32).range(0..24))]
    opening_hour: u32,

    #[arg(long, env = "CLOSING_HOUR", default_value_t = 17, value_parser = clap::value_parser!(u32).range(1..=24))]
    closing_hour: u32,

    #[arg(long, env = "PUBLIC_WEEKS", default_value_t = 1)]
    public_weeks: u32,

    #[arg(long, env = "ADMIN_WEEKS", default_value_t = 2)]
    admin_weeks: u32,

    /// Mark the admin session cookie `Secure`.
    #[arg(long, env = "SECURE_COOKIES")]
    secure_cookies: bool,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                warn!(?err, "Failed to load .env file");
            }
        }
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        WorkingHours::new(self.opening_hour, self.closing_hour).map(|_| ())
    }
}

impl Configuration for ConfigurationHandler {
    fn port(&self) -> String {
        self.port.clone()
    }

    fn database_url(&self) -> Option<String> {
        self.database_url.clone()
    }

    fn admin_credentials(&self) -> Option<AdminCredentials> {
        match (&self.admin_username, &self.admin_password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminCredentials {
                    username: username.clone(),
                    password: password.clone(),
                })
            }
            _ => None,
        }
    }

    fn notification_api_key(&self) -> Option<String> {
        self.resend_api_key.clone().filter(|key| !key.is_empty())
    }

    fn from_email(&self) -> String {
        self.from_email.clone()
    }

    fn timezone(&self) -> Tz {
        self.timezone
    }

    fn working_hours(&self) -> WorkingHours {
        WorkingHours::new(self.opening_hour, self.closing_hour).unwrap_or_default()
    }

    fn public_week_horizon(&self) -> u32 {
        self.public_weeks
    }

    fn admin_week_horizon(&self) -> u32 {
        self.admin_weeks
    }

    fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}
