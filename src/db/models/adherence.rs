use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-user check-in summary maintained by the check-in aggregator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AdherenceStats {
    pub user_id: String,
    pub streak_days: i64,
    pub last_checkin_at: Option<NaiveDateTime>,
    pub avg_7d: Option<f64>,
    pub avg_14d: Option<f64>,
    pub avg_30d: Option<f64>,
    pub updated_at: NaiveDateTime,
}
