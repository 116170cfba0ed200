use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    pub checkin_frequency: i32,
    pub motivation_enabled: bool,
    pub positive_notif_enabled: bool,
    pub positive_notif_interval_minutes: i32,
    pub last_phq2_date: Option<NaiveDate>,
    pub last_photo_memory_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Named check-in reminder slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotName {
    Morning,
    Noon,
    Evening,
}

impl SlotName {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "morning" => Some(SlotName::Morning),
            "noon" => Some(SlotName::Noon),
            "evening" => Some(SlotName::Evening),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotName::Morning => "morning",
            SlotName::Noon => "noon",
            SlotName::Evening => "evening",
        }
    }

    /// Display order used by the journey overview.
    pub fn ordinal(self) -> u8 {
        match self {
            SlotName::Morning => 0,
            SlotName::Noon => 1,
            SlotName::Evening => 2,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CheckinSlot {
    pub user_id: String,
    pub slot_name: String,
    pub local_hour: i32,
    pub local_minute: i32,
    pub enabled: bool,
}

/// An enabled slot that has no pending reminder job yet.
#[derive(Debug, Clone, FromRow)]
pub struct UnplannedSlot {
    pub user_id: String,
    pub slot_name: String,
    pub local_hour: i32,
    pub local_minute: i32,
}

/// A user due for a periodic positive message.
#[derive(Debug, Clone, FromRow)]
pub struct PositiveMessageCandidate {
    pub user_id: String,
    pub positive_notif_interval_minutes: i32,
}
