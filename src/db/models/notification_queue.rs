use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Lifecycle of a queued push: `pending` until the worker attempts it, then
/// `sent` or `failed`. Rows are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Sent,
    Failed,
}

impl JobStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "sent" => Some(JobStatus::Sent),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Sent => "sent",
            JobStatus::Failed => "failed",
        }
    }
}

/// One queued notification awaiting (or done with) delivery.
///
/// `purpose` + `payload_json` are the serialized form of
/// `services::notifications::QueuedNotification`; the worker decodes them
/// back into the typed variant before building the push message.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct NotificationJob {
    pub job_id: String,
    pub user_id: String,
    /// Device token known at enqueue time. Informational only: the worker
    /// always resolves the user's most recently seen active token.
    pub token_id: Option<String>,
    pub purpose: String,
    pub payload_json: String,
    pub scheduled_at: NaiveDateTime,
    pub sent_at: Option<NaiveDateTime>,
    pub status: String,
    pub error: Option<String>,
    pub created_at: NaiveDateTime,
}

impl NotificationJob {
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::from_str(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct CreateNotificationJob {
    pub user_id: String,
    pub token_id: Option<String>,
    pub purpose: String,
    pub payload_json: String,
    pub scheduled_at: NaiveDateTime,
}
