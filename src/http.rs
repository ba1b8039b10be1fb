use crate::backend::BookingBackend;
use crate::block_request::{BlockKind, CreateBlockedTimeRequest};
use crate::booking_manager::{BookingManager, BookingRequest, BookingScope, WeekCalendar};
use crate::configuration::Configuration;
use crate::error::BookingError;
use crate::notifier::{Notifier, ResendNotifier};
use crate::session::{AdminSessions, SESSION_COOKIE, SESSION_DAYS};
use crate::types::{BlockedTime, BookedSlot, Booking};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Display;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState<T: BookingBackend, C: Configuration> {
    booking_manager: BookingManager<T>,
    sessions: AdminSessions,
    configuration: C,
}

#[derive(Debug, Default, Deserialize)]
struct BookingsQuery {
    #[serde(default)]
    scope: BookingScope,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarQuery {
    #[serde(default)]
    week_offset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct UpdateNotesRequest {
    notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// Builds the router. Notes notifications are sent through Resend when an
/// API key is configured.
pub fn create_app<T: BookingBackend, C: Configuration>(backend: T, configuration: C) -> Router {
    let notifier = configuration.notification_api_key().map(|api_key| {
        Arc::new(ResendNotifier::new(
            api_key,
            configuration.from_email(),
            configuration.timezone(),
        )) as Arc<dyn Notifier>
    });
    if notifier.is_none() {
        info!("No notification API key configured, notes emails are disabled");
    }
    create_app_with_notifier(backend, configuration, notifier)
}

pub fn create_app_with_notifier<T: BookingBackend, C: Configuration>(
    backend: T,
    configuration: C,
    notifier: Option<Arc<dyn Notifier>>,
) -> Router {
    let mut booking_manager = BookingManager::new(
        backend,
        configuration.working_hours(),
        configuration.timezone(),
    );
    if let Some(notifier) = notifier {
        booking_manager = booking_manager.with_notifier(notifier);
    }
    let state = AppState {
        booking_manager,
        sessions: AdminSessions::new(configuration.admin_credentials()),
        configuration,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route(
            "/bookings",
            get(list_bookings::<T, C>).post(create_booking::<T, C>),
        )
        .route("/blocked-time", get(list_blocked_times::<T, C>))
        .route("/calendar", get(public_calendar::<T, C>))
        .route("/admin/login", post(login::<T, C>));

    let admin = Router::new()
        .route(
            "/bookings/:id",
            get(get_booking::<T, C>).delete(cancel_booking::<T, C>),
        )
        .route("/bookings/:id/notes", patch(update_booking_notes::<T, C>))
        .route("/blocked-time", post(create_blocked_time::<T, C>))
        .route("/blocked-time/:id", delete(delete_blocked_time::<T, C>))
        .route("/admin/calendar", get(admin_calendar::<T, C>))
        .route("/admin/logout", post(logout::<T, C>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth::<T, C>,
        ));

    Router::new()
        .merge(public)
        .merge(admin)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn invalid_request(rejection: impl Display) -> BookingError {
    BookingError::validation(rejection.to_string())
}

fn is_admin<T: BookingBackend, C: Configuration>(state: &AppState<T, C>, jar: &CookieJar) -> bool {
    jar.get(SESSION_COOKIE)
        .is_some_and(|cookie| state.sessions.is_valid(cookie.value(), Utc::now()))
}

async fn admin_auth<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, BookingError> {
    if jar.get(SESSION_COOKIE).is_none() {
        return Err(BookingError::unauthorized("Missing credentials"));
    }
    if !is_admin(&state, &jar) {
        return Err(BookingError::unauthorized("Unauthorized"));
    }
    Ok(next.run(request).await)
}

/// Admins get full records, everyone else only the booked instants.
async fn list_bookings<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    jar: CookieJar,
    query: Result<Query<BookingsQuery>, QueryRejection>,
) -> Result<Response, BookingError> {
    let Query(query) = query.map_err(invalid_request)?;
    let bookings = state.booking_manager.bookings(query.scope, Utc::now())?;
    if is_admin(&state, &jar) {
        return Ok(Json(bookings).into_response());
    }
    let booked: Vec<BookedSlot> = bookings.iter().map(Booking::redacted).collect();
    Ok(Json(booked).into_response())
}

async fn create_booking<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BookingError> {
    let Json(request) = payload.map_err(invalid_request)?;
    let booking = state.booking_manager.reserve(request, Utc::now())?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn update_booking_notes<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    id: Result<Path<i32>, PathRejection>,
    payload: Result<Json<UpdateNotesRequest>, JsonRejection>,
) -> Result<Json<Booking>, BookingError> {
    let Path(id) = id.map_err(invalid_request)?;
    let Json(request) = payload.map_err(invalid_request)?;
    let booking = state
        .booking_manager
        .update_notes(id, request.notes)
        .await?;
    Ok(Json(booking))
}

async fn get_booking<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Booking>, BookingError> {
    let Path(id) = id.map_err(invalid_request)?;
    Ok(Json(state.booking_manager.booking(id)?))
}

async fn cancel_booking<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Value>, BookingError> {
    let Path(id) = id.map_err(invalid_request)?;
    state.booking_manager.cancel_booking(id)?;
    Ok(Json(json!({ "success": true })))
}

async fn list_blocked_times<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    jar: CookieJar,
) -> Result<Json<Vec<BlockedTime>>, BookingError> {
    let blocked_times = state.booking_manager.blocked_times()?;
    if is_admin(&state, &jar) {
        return Ok(Json(blocked_times));
    }
    Ok(Json(
        blocked_times.iter().map(BlockedTime::redacted).collect(),
    ))
}

async fn create_blocked_time<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    payload: Result<Json<CreateBlockedTimeRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BookingError> {
    let Json(request) = payload.map_err(invalid_request)?;
    let kind = BlockKind::try_from(&request)?;
    let blocked_time = state
        .booking_manager
        .create_block(&kind, request.reason, Utc::now())?;
    Ok((StatusCode::CREATED, Json(blocked_time)))
}

async fn delete_blocked_time<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<Value>, BookingError> {
    let Path(id) = id.map_err(invalid_request)?;
    state.booking_manager.delete_block(id)?;
    Ok(Json(json!({ "success": true })))
}

async fn public_calendar<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> Result<Json<WeekCalendar>, BookingError> {
    let Query(query) = query.map_err(invalid_request)?;
    let week = state.booking_manager.week(
        Utc::now(),
        query.week_offset,
        state.configuration.public_week_horizon(),
        false,
    )?;
    Ok(Json(week))
}

async fn admin_calendar<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    query: Result<Query<CalendarQuery>, QueryRejection>,
) -> Result<Json<WeekCalendar>, BookingError> {
    let Query(query) = query.map_err(invalid_request)?;
    let week = state.booking_manager.week(
        Utc::now(),
        query.week_offset,
        state.configuration.admin_week_horizon(),
        true,
    )?;
    Ok(Json(week))
}

async fn login<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<Value>), BookingError> {
    let Json(request) = payload.map_err(invalid_request)?;
    let token = state
        .sessions
        .login(request.username.trim(), &request.password, Utc::now())?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::days(SESSION_DAYS))
        .secure(state.configuration.secure_cookies());
    Ok((jar.add(cookie), Json(json!({ "success": true }))))
}

async fn logout<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    jar: CookieJar,
) -> (CookieJar, Json<Value>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.logout(cookie.value());
    }
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(json!({ "success": true })),
    )
}
