use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A comment left on an item after a completed rental, joined with the
/// author's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub item_id: i64,
    pub author_id: i64,
    pub author_name: String,
    pub text: String,
    pub created: NaiveDateTime,
}
