use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePlatform {
    Android,
    Ios,
}

impl DevicePlatform {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "android" => Some(DevicePlatform::Android),
            "ios" => Some(DevicePlatform::Ios),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DevicePlatform::Android => "android",
            DevicePlatform::Ios => "ios",
        }
    }
}

/// An installed app instance able to receive pushes.
///
/// `fcm_token` is unique across the table: re-registering a token moves it
/// to the registering user and refreshes `last_seen` instead of inserting.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserDeviceToken {
    pub token_id: String,
    pub user_id: String,
    pub platform: String,
    pub fcm_token: String,
    pub app_version: Option<String>,
    pub last_seen: NaiveDateTime,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct RegisterDeviceToken {
    pub user_id: String,
    pub platform: DevicePlatform,
    pub fcm_token: String,
    pub app_version: Option<String>,
}
