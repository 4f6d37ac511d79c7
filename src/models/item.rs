use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub available: bool,
    pub owner_id: i64,
    /// Set when the item was listed in answer to an ItemRequest.
    pub request_id: Option<i64>,
}
