use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A public "wanted" ask; owners answer it by listing items that carry a
/// matching request_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRequest {
    pub id: i64,
    pub description: String,
    pub requester_id: i64,
    pub created: NaiveDateTime,
}
