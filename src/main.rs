use std::{process::ExitCode, time::Duration};

use crate::{
    configuration::Configuration, configuration_handler::ConfigurationHandler,
    database_interface::DatabaseInterface, http::create_app, local_bookings::LocalBookings,
};
use tokio::time::sleep;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod availability;
mod backend;
mod block_request;
mod booking_manager;
mod calendar;
mod configuration;
mod configuration_handler;
mod database_interface;
mod error;
mod http;
mod local_bookings;
mod notifier;
mod schema;
mod session;
#[cfg(test)]
mod testutils;
mod types;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let configuration = ConfigurationHandler::parse_arguments();
    if let Err(err) = configuration.validate() {
        error!(%err, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    let address = format!("0.0.0.0:{}", configuration.port());
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(?err, "Failed to bind {address}");
            return ExitCode::FAILURE;
        }
    };
    info!(%address, timezone = %configuration.timezone(), "Booking calendar listening");

    let app = if let Some(database_url) = configuration.database_url() {
        let backend = loop {
            match DatabaseInterface::new(&database_url) {
                Ok(backend) => {
                    info!("Successfully connected to database");
                    break backend;
                }
                Err(err) => {
                    error!(?err, "Failed to open database: {database_url}. Retry in 1 sec. Unset DATABASE_URL to run with in-memory bookings.");
                    sleep(Duration::from_secs(1)).await;
                }
            }
        };
        create_app(backend, configuration)
    } else {
        warn!("No DATABASE_URL configured, bookings are kept in memory only");
        create_app(LocalBookings::default(), configuration)
    };

    if let Err(err) = axum::serve(listener, app).await {
        error!(?err, "Server terminated");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
