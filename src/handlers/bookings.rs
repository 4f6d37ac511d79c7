use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::handlers::sharer_id;
use crate::models::{Booking, BookingState};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct NewBookingRequest {
    pub item_id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Deserialize)]
pub struct ApproveQuery {
    pub approved: bool,
}

#[derive(Deserialize)]
pub struct StateQuery {
    pub state: Option<String>,
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: i64,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: String,
    pub booker: ShortUserResponse,
    pub item: ShortItemResponse,
}

#[derive(Serialize)]
pub struct ShortUserResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize)]
pub struct ShortItemResponse {
    pub id: i64,
    pub name: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        BookingResponse {
            id: b.id,
            start: b.start,
            end: b.end,
            status: b.status.as_str().to_string(),
            booker: ShortUserResponse {
                id: b.booker_id,
                name: b.booker_name,
            },
            item: ShortItemResponse {
                id: b.item_id,
                name: b.item_name,
            },
        }
    }
}

fn parse_state(query: StateQuery) -> Result<BookingState, AppError> {
    match query.state {
        None => Ok(BookingState::All),
        Some(s) => BookingState::parse(&s)
            .ok_or_else(|| AppError::Validation(format!("unknown booking state: {s}"))),
    }
}

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<NewBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let user_id = sharer_id(&headers)?;
    let booking = state
        .bookings
        .create_booking(user_id, req.item_id, &req.start, &req.end)?;
    Ok(Json(booking.into()))
}

// PATCH /bookings/:id?approved=true|false
pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
    Query(query): Query<ApproveQuery>,
) -> Result<Json<BookingResponse>, AppError> {
    let user_id = sharer_id(&headers)?;
    let booking = state
        .bookings
        .update_booking_status(user_id, booking_id, query.approved)?;
    Ok(Json(booking.into()))
}

// GET /bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(booking_id): Path<i64>,
) -> Result<Json<BookingResponse>, AppError> {
    let user_id = sharer_id(&headers)?;
    let booking = state.bookings.get_booking_by_id(user_id, booking_id)?;
    Ok(Json(booking.into()))
}

// GET /bookings?state=
pub async fn list_bookings_as_booker(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StateQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let user_id = sharer_id(&headers)?;
    let booking_state = parse_state(query)?;
    let bookings = state
        .bookings
        .get_bookings_by_booker(user_id, booking_state)?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

// GET /bookings/owner?state=
pub async fn list_bookings_as_owner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<StateQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let user_id = sharer_id(&headers)?;
    let booking_state = parse_state(query)?;
    let bookings = state
        .bookings
        .get_bookings_by_owner(user_id, booking_state)?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}
