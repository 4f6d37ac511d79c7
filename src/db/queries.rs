use chrono::NaiveDateTime;
use rusqlite::{params, Connection};

use crate::models::{Booking, BookingFilter, BookingStatus, Comment, Item, ItemRequest, User};

const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn fmt_dt(dt: &NaiveDateTime) -> String {
    dt.format(DT_FORMAT).to_string()
}

/// A stored timestamp that fails to parse is corrupt data; surface it
/// rather than substituting a clock value that would skew time filters.
fn parse_dt(idx: usize, s: &str) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, DT_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

// ── Users ──

pub fn create_user(conn: &Connection, name: &str, email: &str) -> anyhow::Result<User> {
    conn.execute(
        "INSERT INTO users (name, email) VALUES (?1, ?2)",
        params![name, email],
    )?;
    Ok(User {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        email: email.to_string(),
    })
}

pub fn get_user(conn: &Connection, id: i64) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, name, email FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        },
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_users(conn: &Connection) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name, email FROM users ORDER BY id ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
        })
    })?;

    let mut users = vec![];
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

pub fn update_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE users SET name = ?1, email = ?2 WHERE id = ?3",
        params![user.name, user.email, user.id],
    )?;
    Ok(())
}

pub fn delete_user(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Items ──

pub fn create_item(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    description: &str,
    available: bool,
    request_id: Option<i64>,
) -> anyhow::Result<Item> {
    conn.execute(
        "INSERT INTO items (name, description, available, owner_id, request_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![name, description, available as i32, owner_id, request_id],
    )?;
    Ok(Item {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        description: description.to_string(),
        available,
        owner_id,
        request_id,
    })
}

pub fn get_item(conn: &Connection, id: i64) -> anyhow::Result<Option<Item>> {
    let result = conn.query_row(
        "SELECT id, name, description, available, owner_id, request_id FROM items WHERE id = ?1",
        params![id],
        parse_item_row,
    );

    match result {
        Ok(item) => Ok(Some(item)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_item(conn: &Connection, item: &Item) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE items SET name = ?1, description = ?2, available = ?3 WHERE id = ?4",
        params![item.name, item.description, item.available as i32, item.id],
    )?;
    Ok(())
}

pub fn list_items_by_owner(conn: &Connection, owner_id: i64) -> anyhow::Result<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, available, owner_id, request_id
         FROM items WHERE owner_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![owner_id], parse_item_row)?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn count_items_by_owner(conn: &Connection, owner_id: i64) -> anyhow::Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM items WHERE owner_id = ?1",
        params![owner_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn search_items(conn: &Connection, text: &str) -> anyhow::Result<Vec<Item>> {
    let pattern = format!("%{}%", text);
    let mut stmt = conn.prepare(
        "SELECT id, name, description, available, owner_id, request_id
         FROM items
         WHERE available = 1 AND (name LIKE ?1 OR description LIKE ?1)
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![pattern], parse_item_row)?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

pub fn list_items_by_request(conn: &Connection, request_id: i64) -> anyhow::Result<Vec<Item>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, available, owner_id, request_id
         FROM items WHERE request_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![request_id], parse_item_row)?;

    let mut items = vec![];
    for row in rows {
        items.push(row?);
    }
    Ok(items)
}

fn parse_item_row(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        available: row.get::<_, i32>(3)? != 0,
        owner_id: row.get(4)?,
        request_id: row.get(5)?,
    })
}

// ── Item requests ──

pub fn create_request(
    conn: &Connection,
    requester_id: i64,
    description: &str,
    created: &NaiveDateTime,
) -> anyhow::Result<ItemRequest> {
    conn.execute(
        "INSERT INTO item_requests (description, requester_id, created) VALUES (?1, ?2, ?3)",
        params![description, requester_id, fmt_dt(created)],
    )?;
    Ok(ItemRequest {
        id: conn.last_insert_rowid(),
        description: description.to_string(),
        requester_id,
        created: *created,
    })
}

pub fn get_request(conn: &Connection, id: i64) -> anyhow::Result<Option<ItemRequest>> {
    let result = conn.query_row(
        "SELECT id, description, requester_id, created FROM item_requests WHERE id = ?1",
        params![id],
        parse_request_row,
    );

    match result {
        Ok(request) => Ok(Some(request)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_requests_by_requester(
    conn: &Connection,
    requester_id: i64,
) -> anyhow::Result<Vec<ItemRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, description, requester_id, created
         FROM item_requests WHERE requester_id = ?1 ORDER BY created DESC",
    )?;
    let rows = stmt.query_map(params![requester_id], parse_request_row)?;

    let mut requests = vec![];
    for row in rows {
        requests.push(row?);
    }
    Ok(requests)
}

pub fn list_requests_of_others(conn: &Connection, user_id: i64) -> anyhow::Result<Vec<ItemRequest>> {
    let mut stmt = conn.prepare(
        "SELECT id, description, requester_id, created
         FROM item_requests WHERE requester_id != ?1 ORDER BY created DESC",
    )?;
    let rows = stmt.query_map(params![user_id], parse_request_row)?;

    let mut requests = vec![];
    for row in rows {
        requests.push(row?);
    }
    Ok(requests)
}

fn parse_request_row(row: &rusqlite::Row) -> rusqlite::Result<ItemRequest> {
    let created_str: String = row.get(3)?;
    Ok(ItemRequest {
        id: row.get(0)?,
        description: row.get(1)?,
        requester_id: row.get(2)?,
        created: parse_dt(3, &created_str)?,
    })
}

// ── Bookings ──

const SELECT_BOOKING: &str = "SELECT b.id, b.item_id, i.name, i.owner_id, b.booker_id, u.name, \
     b.start_date, b.end_date, b.status \
     FROM bookings b \
     JOIN items i ON i.id = b.item_id \
     JOIN users u ON u.id = b.booker_id";

pub fn create_booking(
    conn: &Connection,
    item_id: i64,
    booker_id: i64,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
    status: BookingStatus,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO bookings (item_id, booker_id, start_date, end_date, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![item_id, booker_id, fmt_dt(start), fmt_dt(end), status.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_booking(conn: &Connection, id: i64) -> anyhow::Result<Option<Booking>> {
    let sql = format!("{SELECT_BOOKING} WHERE b.id = ?1");
    let result = conn.query_row(&sql, params![id], parse_booking_row);

    match result {
        Ok(booking) => Ok(Some(booking)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Whether the booker has a booking of this item that already ended.
pub fn has_completed_booking(
    conn: &Connection,
    booker_id: i64,
    item_id: i64,
    now: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings
         WHERE booker_id = ?1 AND item_id = ?2 AND end_date < ?3",
        params![booker_id, item_id, fmt_dt(now)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn set_booking_status(conn: &Connection, id: i64, status: BookingStatus) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    Ok(count > 0)
}

pub fn list_bookings_by_booker(
    conn: &Connection,
    booker_id: i64,
    filter: &BookingFilter,
) -> anyhow::Result<Vec<Booking>> {
    list_bookings(conn, "b.booker_id = ?1", booker_id, filter)
}

pub fn list_bookings_by_owner(
    conn: &Connection,
    owner_id: i64,
    filter: &BookingFilter,
) -> anyhow::Result<Vec<Booking>> {
    list_bookings(conn, "i.owner_id = ?1", owner_id, filter)
}

fn list_bookings(
    conn: &Connection,
    scope: &str,
    id: i64,
    filter: &BookingFilter,
) -> anyhow::Result<Vec<Booking>> {
    let mut sql = format!("{SELECT_BOOKING} WHERE {scope}");
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(id)];

    match filter {
        BookingFilter::Any => {}
        BookingFilter::Status(status) => {
            sql.push_str(" AND b.status = ?2");
            params_vec.push(Box::new(status.as_str().to_string()));
        }
        BookingFilter::StatusIn(statuses) => {
            let placeholders: Vec<String> = (0..statuses.len())
                .map(|i| format!("?{}", i + 2))
                .collect();
            sql.push_str(&format!(" AND b.status IN ({})", placeholders.join(", ")));
            for status in statuses {
                params_vec.push(Box::new(status.as_str().to_string()));
            }
        }
        BookingFilter::Current(now) => {
            sql.push_str(" AND b.start_date <= ?2 AND b.end_date >= ?2");
            params_vec.push(Box::new(fmt_dt(now)));
        }
        BookingFilter::Future(now) => {
            sql.push_str(" AND b.start_date > ?2");
            params_vec.push(Box::new(fmt_dt(now)));
        }
        BookingFilter::Past(now) => {
            sql.push_str(" AND b.end_date < ?2");
            params_vec.push(Box::new(fmt_dt(now)));
        }
    }

    sql.push_str(" ORDER BY b.start_date DESC");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let start_str: String = row.get(6)?;
    let end_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;

    Ok(Booking {
        id: row.get(0)?,
        item_id: row.get(1)?,
        item_name: row.get(2)?,
        item_owner_id: row.get(3)?,
        booker_id: row.get(4)?,
        booker_name: row.get(5)?,
        start: parse_dt(6, &start_str)?,
        end: parse_dt(7, &end_str)?,
        status: BookingStatus::from_str(&status_str),
    })
}

// ── Comments ──

const SELECT_COMMENT: &str = "SELECT c.id, c.item_id, c.author_id, u.name, c.text, c.created \
     FROM comments c \
     JOIN users u ON u.id = c.author_id";

pub fn create_comment(
    conn: &Connection,
    item_id: i64,
    author_id: i64,
    text: &str,
    created: &NaiveDateTime,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO comments (item_id, author_id, text, created) VALUES (?1, ?2, ?3, ?4)",
        params![item_id, author_id, text, fmt_dt(created)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_comment(conn: &Connection, id: i64) -> anyhow::Result<Option<Comment>> {
    let sql = format!("{SELECT_COMMENT} WHERE c.id = ?1");
    let result = conn.query_row(&sql, params![id], parse_comment_row);

    match result {
        Ok(comment) => Ok(Some(comment)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_comments_by_item(conn: &Connection, item_id: i64) -> anyhow::Result<Vec<Comment>> {
    let sql = format!("{SELECT_COMMENT} WHERE c.item_id = ?1 ORDER BY c.created DESC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![item_id], parse_comment_row)?;

    let mut comments = vec![];
    for row in rows {
        comments.push(row?);
    }
    Ok(comments)
}

fn parse_comment_row(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    let created_str: String = row.get(5)?;
    Ok(Comment {
        id: row.get(0)?,
        item_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        text: row.get(4)?,
        created: parse_dt(5, &created_str)?,
    })
}
