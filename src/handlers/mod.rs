pub mod bookings;
pub mod health;
pub mod items;
pub mod requests;
pub mod users;

use axum::http::HeaderMap;

use crate::errors::AppError;

pub const SHARER_HEADER: &str = "x-sharer-user-id";

/// Caller identity travels in the X-Sharer-User-Id header.
pub fn sharer_id(headers: &HeaderMap) -> Result<i64, AppError> {
    headers
        .get(SHARER_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| AppError::Validation("missing or invalid X-Sharer-User-Id header".into()))
}
