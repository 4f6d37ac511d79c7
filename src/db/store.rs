use std::sync::{Arc, Mutex};

use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingFilter, BookingStatus, Item, User};
use crate::services::booking::{BookingStore, ItemProvider, UserProvider};

/// All three booking-engine collaborators, backed by the one shared
/// SQLite connection. Each call is a single locked unit of work.
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }
}

impl UserProvider for SqliteStore {
    fn get_user(&self, id: i64) -> Result<User, AppError> {
        let conn = self.db.lock().unwrap();
        queries::get_user(&conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("user with id={id} not found")))
    }
}

impl ItemProvider for SqliteStore {
    fn get_item(&self, id: i64) -> Result<Item, AppError> {
        let conn = self.db.lock().unwrap();
        queries::get_item(&conn, id)?
            .ok_or_else(|| AppError::NotFound(format!("item with id={id} not found")))
    }

    fn owner_item_count(&self, owner_id: i64) -> Result<i64, AppError> {
        let conn = self.db.lock().unwrap();
        Ok(queries::count_items_by_owner(&conn, owner_id)?)
    }
}

impl BookingStore for SqliteStore {
    fn create(
        &self,
        item_id: i64,
        booker_id: i64,
        start: &NaiveDateTime,
        end: &NaiveDateTime,
        status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let conn = self.db.lock().unwrap();
        let id = queries::create_booking(&conn, item_id, booker_id, start, end, status)?;
        queries::get_booking(&conn, id)?
            .ok_or_else(|| AppError::Database(anyhow::anyhow!("booking {id} missing after insert")))
    }

    fn get(&self, id: i64) -> Result<Option<Booking>, AppError> {
        let conn = self.db.lock().unwrap();
        Ok(queries::get_booking(&conn, id)?)
    }

    fn set_status(&self, id: i64, status: BookingStatus) -> Result<Booking, AppError> {
        let conn = self.db.lock().unwrap();
        queries::set_booking_status(&conn, id, status)?;
        queries::get_booking(&conn, id)?.ok_or_else(|| {
            AppError::Database(anyhow::anyhow!("booking {id} missing on status update"))
        })
    }

    fn by_booker(&self, booker_id: i64, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let conn = self.db.lock().unwrap();
        Ok(queries::list_bookings_by_booker(&conn, booker_id, filter)?)
    }

    fn by_owner(&self, owner_id: i64, filter: &BookingFilter) -> Result<Vec<Booking>, AppError> {
        let conn = self.db.lock().unwrap();
        Ok(queries::list_bookings_by_owner(&conn, owner_id, filter)?)
    }
}
