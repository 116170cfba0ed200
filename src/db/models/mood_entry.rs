use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Where a mood entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodSource {
    Checkin,
    Chat,
}

impl MoodSource {
    pub fn as_str(self) -> &'static str {
        match self {
            MoodSource::Checkin => "checkin",
            MoodSource::Chat => "chat",
        }
    }
}

/// Append-only mood sample. `note` is kept as an opaque blob.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MoodEntry {
    pub id: String,
    pub user_id: String,
    pub score: i32,
    pub label: Option<String>,
    #[serde(skip_serializing)]
    pub note: Option<Vec<u8>>,
    pub emojis_json: Option<String>,
    pub source: String,
    pub captured_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMoodEntry {
    pub user_id: String,
    pub score: i32,
    pub label: Option<String>,
    pub note: Option<Vec<u8>>,
    pub emojis_json: Option<String>,
    pub source: MoodSource,
    pub captured_at: NaiveDateTime,
}

/// Score and timestamp only, as consumed by the check-in aggregator.
#[derive(Debug, Clone, Copy, PartialEq, FromRow)]
pub struct MoodSample {
    pub score: i32,
    pub captured_at: NaiveDateTime,
}

/// Per-day aggregate. `day` is `YYYY-MM-DD` (UTC).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyMood {
    pub day: String,
    pub avg_score: f64,
    pub entries_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}
