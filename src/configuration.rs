use crate::calendar::WorkingHours;
use crate::session::AdminCredentials;
use chrono_tz::Tz;

pub trait Configuration: Clone + Send + Sync + 'static {
    fn port(&self) -> String;
    fn database_url(&self) -> Option<String>;
    fn admin_credentials(&self) -> Option<AdminCredentials>;
    /// Notifications are disabled without an API key.
    fn notification_api_key(&self) -> Option<String>;
    fn from_email(&self) -> String;
    fn timezone(&self) -> Tz;
    fn working_hours(&self) -> WorkingHours;
    /// Largest week offset the public calendar may show.
    fn public_week_horizon(&self) -> u32;
    /// Largest week offset the admin calendar may show.
    fn admin_week_horizon(&self) -> u32;
    fn secure_cookies(&self) -> bool;
}
