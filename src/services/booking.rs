use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};

use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingState, BookingStatus, Item, User};

/// Looks up users by id; missing users surface as NotFound.
pub trait UserProvider: Send + Sync {
    fn get_user(&self, id: i64) -> Result<User, AppError>;
}

/// Looks up items by id; missing items surface as NotFound.
pub trait ItemProvider: Send + Sync {
    fn get_item(&self, id: i64) -> Result<Item, AppError>;
    fn owner_item_count(&self, owner_id: i64) -> Result<i64, AppError>;
}

/// Persists bookings and answers the filtered list queries. Results are
/// always sorted descending by start.
pub trait BookingStore: Send + Sync {
    fn create(
        &self,
        item_id: i64,
        booker_id: i64,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
        status: BookingStatus,
    ) -> Result<Booking, AppError>;
    fn get(&self, id: i64) -> Result<Option<Booking>, AppError>;
    fn set_status(&self, id: i64, status: BookingStatus) -> Result<Booking, AppError>;
    fn by_booker(&self, booker_id: i64, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;
    fn by_owner(&self, owner_id: i64, filter: &BookingFilter) -> Result<Vec<Booking>, AppError>;
}

/// The booking lifecycle: creation against an available item, a single
/// WAITING -> APPROVED/REJECTED transition decided by the item's owner,
/// and the state-filtered list queries for both sides of a booking.
pub struct BookingEngine {
    users: Arc<dyn UserProvider>,
    items: Arc<dyn ItemProvider>,
    store: Arc<dyn BookingStore>,
}

impl BookingEngine {
    pub fn new(
        users: Arc<dyn UserProvider>,
        items: Arc<dyn ItemProvider>,
        store: Arc<dyn BookingStore>,
    ) -> Self {
        Self {
            users,
            items,
            store,
        }
    }

    pub fn create_booking(
        &self,
        requester_id: i64,
        item_id: i64,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
    ) -> Result<Booking, AppError> {
        tracing::info!("user {requester_id} creating booking for item {item_id}");

        if end <= start {
            return Err(AppError::Validation("invalid start/end dates".into()));
        }

        let booker = self.users.get_user(requester_id)?;
        let item = self.items.get_item(item_id)?;

        if !item.available {
            return Err(AppError::Validation(
                "item is not available for booking".into(),
            ));
        }

        // Note: no owner == requester check here; owners may book their
        // own items.
        let booking = self
            .store
            .create(item.id, booker.id, start, end, BookingStatus::Waiting)?;

        tracing::info!("booking {} created for item {}", booking.id, item.id);
        Ok(booking)
    }

    pub fn update_booking_status(
        &self,
        user_id: i64,
        booking_id: i64,
        approved: bool,
    ) -> Result<Booking, AppError> {
        tracing::info!("user {user_id} updating status of booking {booking_id}");

        let booking = self.get_existing_booking(booking_id)?;

        if booking.item_owner_id != user_id {
            return Err(AppError::Forbidden(
                "only the item's owner can change a booking's status".into(),
            ));
        }

        if booking.status != BookingStatus::Waiting {
            return Err(AppError::Validation(
                "booking status is already finalized".into(),
            ));
        }

        let status = if approved {
            BookingStatus::Approved
        } else {
            BookingStatus::Rejected
        };
        let updated = self.store.set_status(booking.id, status)?;

        tracing::info!("booking {} is now {}", updated.id, updated.status.as_str());
        Ok(updated)
    }

    pub fn get_booking_by_id(&self, user_id: i64, booking_id: i64) -> Result<Booking, AppError> {
        tracing::info!("user {user_id} requested booking {booking_id}");

        self.users.get_user(user_id)?;
        let booking = self.get_existing_booking(booking_id)?;

        let is_booker = booking.booker_id == user_id;
        let is_owner = booking.item_owner_id == user_id;
        if !is_booker && !is_owner {
            return Err(AppError::Forbidden(
                "user has no access to this booking".into(),
            ));
        }

        Ok(booking)
    }

    pub fn get_bookings_by_booker(
        &self,
        booker_id: i64,
        state: BookingState,
    ) -> Result<Vec<Booking>, AppError> {
        tracing::info!("booker {booker_id} requested bookings in state {state:?}");

        self.users.get_user(booker_id)?;

        let now = Utc::now().naive_utc();
        let filter = match state {
            BookingState::All => BookingFilter::Any,
            BookingState::Waiting => BookingFilter::Status(BookingStatus::Waiting),
            // Booker-side REJECTED folds in CANCELED.
            BookingState::Rejected => BookingFilter::StatusIn(vec![
                BookingStatus::Rejected,
                BookingStatus::Canceled,
            ]),
            BookingState::Current => BookingFilter::Current(now),
            BookingState::Future => BookingFilter::Future(now),
            BookingState::Past => BookingFilter::Past(now),
        };

        self.store.by_booker(booker_id, &filter)
    }

    pub fn get_bookings_by_owner(
        &self,
        owner_id: i64,
        state: BookingState,
    ) -> Result<Vec<Booking>, AppError> {
        tracing::info!("owner {owner_id} requested bookings in state {state:?}");

        self.users.get_user(owner_id)?;

        if self.items.owner_item_count(owner_id)? == 0 {
            return Err(AppError::Validation(
                "owner has no items to receive bookings".into(),
            ));
        }

        let now = Utc::now().naive_utc();
        let filter = match state {
            BookingState::All => BookingFilter::Any,
            BookingState::Waiting => BookingFilter::Status(BookingStatus::Waiting),
            // Owner-side REJECTED is exact, unlike the booker-side query.
            BookingState::Rejected => BookingFilter::Status(BookingStatus::Rejected),
            BookingState::Current => BookingFilter::Current(now),
            BookingState::Future => BookingFilter::Future(now),
            BookingState::Past => BookingFilter::Past(now),
        };

        self.store.by_owner(owner_id, &filter)
    }

    fn get_existing_booking(&self, booking_id: i64) -> Result<Booking, AppError> {
        self.store
            .get(booking_id)?
            .ok_or_else(|| AppError::NotFound(format!("booking with id={booking_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Duration;
    use rusqlite::Connection;

    use super::*;
    use crate::db;
    use crate::db::queries;
    use crate::db::store::SqliteStore;

    fn setup() -> (Arc<Mutex<Connection>>, BookingEngine) {
        let conn = db::init_db(":memory:").unwrap();
        let db = Arc::new(Mutex::new(conn));
        let store = Arc::new(SqliteStore::new(Arc::clone(&db)));
        let engine = BookingEngine::new(store.clone(), store.clone(), store);
        (db, engine)
    }

    fn seed_user(db: &Arc<Mutex<Connection>>, name: &str) -> User {
        let conn = db.lock().unwrap();
        queries::create_user(&conn, name, &format!("{name}@example.com")).unwrap()
    }

    fn seed_item(db: &Arc<Mutex<Connection>>, owner_id: i64, available: bool) -> Item {
        let conn = db.lock().unwrap();
        queries::create_item(&conn, owner_id, "drill", "cordless drill", available, None).unwrap()
    }

    fn hours(n: i64) -> NaiveDateTime {
        Utc::now().naive_utc() + Duration::hours(n)
    }

    #[test]
    fn create_booking_starts_waiting() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let booking = engine
            .create_booking(booker.id, item.id, &hours(1), &hours(2))
            .unwrap();

        assert!(booking.id > 0);
        assert_eq!(booking.status, BookingStatus::Waiting);
        assert_eq!(booking.booker_id, booker.id);
        assert_eq!(booking.item_id, item.id);
        assert_eq!(booking.item_owner_id, owner.id);
    }

    #[test]
    fn create_booking_rejects_end_before_start() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let result = engine.create_booking(booker.id, item.id, &hours(2), &hours(1));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn create_booking_rejects_equal_start_and_end() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let at = hours(1);
        let result = engine.create_booking(booker.id, item.id, &at, &at);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn create_booking_unknown_user_is_not_found() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let item = seed_item(&db, owner.id, true);

        let result = engine.create_booking(999, item.id, &hours(1), &hours(2));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn create_booking_unknown_item_is_not_found() {
        let (db, engine) = setup();
        let booker = seed_user(&db, "booker");

        let result = engine.create_booking(booker.id, 999, &hours(1), &hours(2));
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn create_booking_rejects_unavailable_item_and_persists_nothing() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, false);

        let result = engine.create_booking(booker.id, item.id, &hours(1), &hours(2));
        assert!(matches!(result, Err(AppError::Validation(_))));

        let bookings = engine
            .get_bookings_by_booker(booker.id, BookingState::All)
            .unwrap();
        assert!(bookings.is_empty());
    }

    #[test]
    fn owner_may_book_own_item() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let item = seed_item(&db, owner.id, true);

        let booking = engine
            .create_booking(owner.id, item.id, &hours(1), &hours(2))
            .unwrap();
        assert_eq!(booking.booker_id, owner.id);
    }

    #[test]
    fn approve_then_second_decision_fails() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let booking = engine
            .create_booking(booker.id, item.id, &hours(1), &hours(2))
            .unwrap();

        let approved = engine
            .update_booking_status(owner.id, booking.id, true)
            .unwrap();
        assert_eq!(approved.status, BookingStatus::Approved);

        let again = engine.update_booking_status(owner.id, booking.id, false);
        assert!(matches!(again, Err(AppError::Validation(_))));
    }

    #[test]
    fn reject_sets_rejected() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let booking = engine
            .create_booking(booker.id, item.id, &hours(1), &hours(2))
            .unwrap();

        let rejected = engine
            .update_booking_status(owner.id, booking.id, false)
            .unwrap();
        assert_eq!(rejected.status, BookingStatus::Rejected);
    }

    #[test]
    fn booker_cannot_decide_own_booking() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let booking = engine
            .create_booking(booker.id, item.id, &hours(1), &hours(2))
            .unwrap();

        let result = engine.update_booking_status(booker.id, booking.id, true);
        assert!(matches!(result, Err(AppError::Forbidden(_))));

        // Still waiting, so the owner can decide afterwards.
        let decided = engine
            .update_booking_status(owner.id, booking.id, true)
            .unwrap();
        assert_eq!(decided.status, BookingStatus::Approved);
    }

    #[test]
    fn update_unknown_booking_is_not_found() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");

        let result = engine.update_booking_status(owner.id, 42, true);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn get_booking_visible_to_booker_and_owner_only() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let stranger = seed_user(&db, "stranger");
        let item = seed_item(&db, owner.id, true);

        let booking = engine
            .create_booking(booker.id, item.id, &hours(1), &hours(2))
            .unwrap();

        assert!(engine.get_booking_by_id(booker.id, booking.id).is_ok());
        assert!(engine.get_booking_by_id(owner.id, booking.id).is_ok());

        let result = engine.get_booking_by_id(stranger.id, booking.id);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn booker_time_filters_partition_bookings() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let past = engine
            .create_booking(booker.id, item.id, &hours(-3), &hours(-2))
            .unwrap();
        let current = engine
            .create_booking(booker.id, item.id, &hours(-1), &hours(1))
            .unwrap();
        let future = engine
            .create_booking(booker.id, item.id, &hours(2), &hours(3))
            .unwrap();

        let ids = |state| -> Vec<i64> {
            engine
                .get_bookings_by_booker(booker.id, state)
                .unwrap()
                .iter()
                .map(|b| b.id)
                .collect()
        };

        assert_eq!(ids(BookingState::Past), vec![past.id]);
        assert_eq!(ids(BookingState::Current), vec![current.id]);
        assert_eq!(ids(BookingState::Future), vec![future.id]);
        // ALL is sorted descending by start.
        assert_eq!(ids(BookingState::All), vec![future.id, current.id, past.id]);
    }

    #[test]
    fn booker_rejected_filter_includes_canceled() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let rejected = engine
            .create_booking(booker.id, item.id, &hours(1), &hours(2))
            .unwrap();
        engine
            .update_booking_status(owner.id, rejected.id, false)
            .unwrap();

        let waiting = engine
            .create_booking(booker.id, item.id, &hours(3), &hours(4))
            .unwrap();

        // No operation cancels a booking; plant one directly.
        let canceled = engine
            .create_booking(booker.id, item.id, &hours(5), &hours(6))
            .unwrap();
        {
            let conn = db.lock().unwrap();
            queries::set_booking_status(&conn, canceled.id, BookingStatus::Canceled).unwrap();
        }

        let ids: Vec<i64> = engine
            .get_bookings_by_booker(booker.id, BookingState::Rejected)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![canceled.id, rejected.id]);

        let waiting_ids: Vec<i64> = engine
            .get_bookings_by_booker(booker.id, BookingState::Waiting)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(waiting_ids, vec![waiting.id]);
    }

    #[test]
    fn owner_rejected_filter_excludes_canceled() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");
        let booker = seed_user(&db, "booker");
        let item = seed_item(&db, owner.id, true);

        let rejected = engine
            .create_booking(booker.id, item.id, &hours(1), &hours(2))
            .unwrap();
        engine
            .update_booking_status(owner.id, rejected.id, false)
            .unwrap();

        let canceled = engine
            .create_booking(booker.id, item.id, &hours(3), &hours(4))
            .unwrap();
        {
            let conn = db.lock().unwrap();
            queries::set_booking_status(&conn, canceled.id, BookingStatus::Canceled).unwrap();
        }

        let ids: Vec<i64> = engine
            .get_bookings_by_owner(owner.id, BookingState::Rejected)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![rejected.id]);
    }

    #[test]
    fn owner_query_scopes_to_own_items() {
        let (db, engine) = setup();
        let owner_a = seed_user(&db, "owner-a");
        let owner_b = seed_user(&db, "owner-b");
        let booker = seed_user(&db, "booker");
        let item_a = seed_item(&db, owner_a.id, true);
        let item_b = seed_item(&db, owner_b.id, true);

        let on_a = engine
            .create_booking(booker.id, item_a.id, &hours(1), &hours(2))
            .unwrap();
        engine
            .create_booking(booker.id, item_b.id, &hours(1), &hours(2))
            .unwrap();

        let ids: Vec<i64> = engine
            .get_bookings_by_owner(owner_a.id, BookingState::All)
            .unwrap()
            .iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(ids, vec![on_a.id]);
    }

    #[test]
    fn owner_without_items_fails_validation() {
        let (db, engine) = setup();
        let owner = seed_user(&db, "owner");

        let result = engine.get_bookings_by_owner(owner.id, BookingState::All);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn empty_booker_result_is_not_an_error() {
        let (db, engine) = setup();
        let booker = seed_user(&db, "booker");

        let bookings = engine
            .get_bookings_by_booker(booker.id, BookingState::All)
            .unwrap();
        assert!(bookings.is_empty());
    }

    #[test]
    fn list_for_unknown_user_is_not_found() {
        let (_db, engine) = setup();

        let result = engine.get_bookings_by_booker(7, BookingState::All);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
