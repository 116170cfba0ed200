use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Maximum number of photo memories a user may keep.
pub const MAX_MEMORIES_PER_USER: i64 = 10;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct HappyMemory {
    pub memory_id: String,
    pub user_id: String,
    /// Public path under `/media/`.
    pub image_url: String,
    pub caption: Option<String>,
    pub memory_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
}
