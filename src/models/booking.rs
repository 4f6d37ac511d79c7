use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A booking row joined with its item and booker, so authorization checks
/// and response mapping never need a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub item_owner_id: i64,
    pub booker_id: i64,
    pub booker_name: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: BookingStatus,
}

/// Persisted lifecycle value. Waiting is the only non-terminal state;
/// Canceled is recognized by query filters but no operation sets it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
    Canceled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Waiting => "WAITING",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Canceled => "CANCELED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "APPROVED" => BookingStatus::Approved,
            "REJECTED" => BookingStatus::Rejected,
            "CANCELED" => BookingStatus::Canceled,
            _ => BookingStatus::Waiting,
        }
    }
}

/// Caller-supplied filter for booking list queries. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl BookingState {
    /// Case-insensitive parse of the `state` query parameter. Unknown
    /// values are the caller's problem, not a reachable engine branch.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Some(BookingState::All),
            "CURRENT" => Some(BookingState::Current),
            "PAST" => Some(BookingState::Past),
            "FUTURE" => Some(BookingState::Future),
            "WAITING" => Some(BookingState::Waiting),
            "REJECTED" => Some(BookingState::Rejected),
            _ => None,
        }
    }
}

/// Store-level predicate a BookingState dispatches to. Time-bound
/// variants carry the `now` the engine sampled, so one request sees one
/// consistent clock.
#[derive(Debug, Clone)]
pub enum BookingFilter {
    Any,
    Status(BookingStatus),
    StatusIn(Vec<BookingStatus>),
    Current(NaiveDateTime),
    Future(NaiveDateTime),
    Past(NaiveDateTime),
}
