//! Queued push notifications: the typed job payloads, the delivery worker
//! cycle and the reminder planner that feeds it.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::models::*;
use crate::db::repository::{DeviceTokenRepository, NotificationQueueRepository};
use crate::error::AppResult;
use crate::services::push::{PushClient, PushMessage};

pub const DEFAULT_TITLE: &str = "Mendly";
pub const DEFAULT_BODY: &str = "You have a new notification";
pub const UNKNOWN_ERROR: &str = "unknown error";

pub const PURPOSE_CHECKIN_REMINDER: &str = "checkin_reminder";
pub const PURPOSE_WEEKLY_SUMMARY: &str = "weekly_summary";
pub const PURPOSE_POSITIVE_MESSAGE: &str = "positive_message";

/// Purposes the worker picks up. Anything else stays in the queue untouched.
pub const PUSH_PURPOSES: &[&str] = &[
    PURPOSE_CHECKIN_REMINDER,
    PURPOSE_WEEKLY_SUMMARY,
    PURPOSE_POSITIVE_MESSAGE,
];

const AFFIRMATIONS: &[&str] = &[
    "You are doing better than you think. 🌱",
    "Small steps still move you forward.",
    "Take a slow breath. You deserve a gentle moment.",
    "Your feelings are valid, and so is your progress.",
    "Remember something that made you smile this week.",
    "Be as kind to yourself as you are to others.",
];

// ============================================================================
// Payloads
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckinReminderPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklySummaryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositiveMessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Marks sends triggered from the settings screen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A queue row decoded by purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueuedNotification {
    CheckinReminder(CheckinReminderPayload),
    WeeklySummary(WeeklySummaryPayload),
    PositiveMessage(PositiveMessagePayload),
}

fn parse_payload<T: for<'de> Deserialize<'de> + Default>(payload_json: &str) -> T {
    serde_json::from_str(payload_json).unwrap_or_default()
}

impl QueuedNotification {
    /// Decode a stored job. Malformed payload JSON yields the default
    /// payload; an unknown purpose is an error carrying the reason.
    pub fn decode(purpose: &str, payload_json: &str) -> Result<Self, String> {
        match purpose {
            PURPOSE_CHECKIN_REMINDER => Ok(Self::CheckinReminder(parse_payload(payload_json))),
            PURPOSE_WEEKLY_SUMMARY => Ok(Self::WeeklySummary(parse_payload(payload_json))),
            PURPOSE_POSITIVE_MESSAGE => Ok(Self::PositiveMessage(parse_payload(payload_json))),
            other => Err(format!("unknown notification purpose: {}", other)),
        }
    }

    pub fn purpose(&self) -> &'static str {
        match self {
            Self::CheckinReminder(_) => PURPOSE_CHECKIN_REMINDER,
            Self::WeeklySummary(_) => PURPOSE_WEEKLY_SUMMARY,
            Self::PositiveMessage(_) => PURPOSE_POSITIVE_MESSAGE,
        }
    }

    pub fn payload_json(&self) -> String {
        let value = match self {
            Self::CheckinReminder(p) => serde_json::to_value(p),
            Self::WeeklySummary(p) => serde_json::to_value(p),
            Self::PositiveMessage(p) => serde_json::to_value(p),
        };
        value.map(|v| v.to_string()).unwrap_or_else(|_| "{}".to_string())
    }

    fn title_body(&self) -> (Option<&str>, Option<&str>) {
        match self {
            Self::CheckinReminder(p) => (p.title.as_deref(), p.body.as_deref()),
            Self::WeeklySummary(p) => (p.title.as_deref(), p.body.as_deref()),
            Self::PositiveMessage(p) => (p.title.as_deref(), p.body.as_deref()),
        }
    }

    /// Push message for `fcm_token`, with default title/body filled in.
    pub fn to_push_message(&self, fcm_token: &str) -> PushMessage {
        let (title, body) = self.title_body();
        let mut data = HashMap::new();
        data.insert("purpose".to_string(), self.purpose().to_string());

        PushMessage {
            token: fcm_token.to_string(),
            title: title.unwrap_or(DEFAULT_TITLE).to_string(),
            body: body.unwrap_or(DEFAULT_BODY).to_string(),
            data,
        }
    }
}

/// Queue a notification for `user_id`, recording the user's current device
/// token when one exists.
pub async fn enqueue(
    pool: &SqlitePool,
    user_id: &str,
    notification: &QueuedNotification,
    scheduled_at: NaiveDateTime,
) -> AppResult<NotificationJob> {
    let token_id = DeviceTokenRepository::find_latest_active(pool, user_id)
        .await?
        .map(|t| t.token_id);

    let job = NotificationQueueRepository::create(
        pool,
        CreateNotificationJob {
            user_id: user_id.to_string(),
            token_id,
            purpose: notification.purpose().to_string(),
            payload_json: notification.payload_json(),
            scheduled_at,
        },
    )
    .await?;

    tracing::debug!(
        job_id = %job.job_id,
        purpose = %job.purpose,
        "Queued notification for user {}",
        user_id
    );
    Ok(job)
}

// ============================================================================
// Worker cycle
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Sent,
    Failed,
    /// No active device token; the job stays pending.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Attempt one job and write its status immediately.
pub async fn deliver_job(
    pool: &SqlitePool,
    push: &dyn PushClient,
    job: &NotificationJob,
    now: NaiveDateTime,
) -> AppResult<JobOutcome> {
    let Some(token) = DeviceTokenRepository::find_latest_active(pool, &job.user_id).await? else {
        tracing::debug!(job_id = %job.job_id, "No active device token; leaving job pending");
        return Ok(JobOutcome::Skipped);
    };

    let notification = match QueuedNotification::decode(&job.purpose, &job.payload_json) {
        Ok(n) => n,
        Err(reason) => {
            NotificationQueueRepository::mark_failed(pool, &job.job_id, &reason, now).await?;
            tracing::warn!(job_id = %job.job_id, "Failed notification job: {}", reason);
            return Ok(JobOutcome::Failed);
        }
    };

    let result = push.send(&notification.to_push_message(&token.fcm_token)).await;

    if result.ok {
        NotificationQueueRepository::mark_sent(pool, &job.job_id, now).await?;
        tracing::info!(
            "Sent notification job {} (purpose={}) to user {}",
            job.job_id,
            job.purpose,
            job.user_id
        );
        Ok(JobOutcome::Sent)
    } else {
        let error = result.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string());
        NotificationQueueRepository::mark_failed(pool, &job.job_id, &error, now).await?;
        tracing::warn!("Failed to send notification job {}: {}", job.job_id, error);
        Ok(JobOutcome::Failed)
    }
}

/// One delivery pass over due jobs. A failing job is logged and the pass
/// moves on to the next one.
pub async fn process_due_jobs(
    pool: &SqlitePool,
    push: &dyn PushClient,
    batch_size: i64,
    now: NaiveDateTime,
) -> AppResult<CycleReport> {
    let mut report = CycleReport::default();
    let jobs = NotificationQueueRepository::fetch_due(pool, now, batch_size, PUSH_PURPOSES).await?;

    for job in &jobs {
        match deliver_job(pool, push, job, now).await {
            Ok(JobOutcome::Sent) => report.sent += 1,
            Ok(JobOutcome::Failed) => report.failed += 1,
            Ok(JobOutcome::Skipped) => report.skipped += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!("Error processing notification job {}: {:?}", job.job_id, e);
            }
        }
    }

    Ok(report)
}

// ============================================================================
// Planner
// ============================================================================

/// First `hour:minute` (UTC) strictly after `now`.
pub fn next_occurrence(now: NaiveDateTime, hour: u32, minute: u32) -> Option<NaiveDateTime> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let today = now.date().and_time(time);
    if today > now {
        Some(today)
    } else {
        Some(today + Duration::days(1))
    }
}

fn reminder_body(slot: &str) -> &'static str {
    match SlotName::from_str(slot) {
        Some(SlotName::Morning) => "Good morning! How are you feeling as the day starts?",
        Some(SlotName::Noon) => "Midday check-in: take a moment to notice how you feel.",
        Some(SlotName::Evening) => "Evening check-in: how did today feel overall?",
        None => "Time for a quick check-in.",
    }
}

pub fn pick_affirmation() -> &'static str {
    AFFIRMATIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(AFFIRMATIONS[0])
}

/// Enqueue check-in reminders and positive messages that are not already
/// pending. Returns how many jobs were queued.
pub async fn plan_notifications(pool: &SqlitePool, now: NaiveDateTime) -> AppResult<usize> {
    let mut queued = 0;

    for slot in NotificationQueueRepository::unplanned_checkin_slots(pool).await? {
        let Some(at) = next_occurrence(now, slot.local_hour as u32, slot.local_minute as u32)
        else {
            tracing::warn!(
                "Skipping invalid check-in time {}:{} for user {}",
                slot.local_hour,
                slot.local_minute,
                slot.user_id
            );
            continue;
        };

        let reminder = QueuedNotification::CheckinReminder(CheckinReminderPayload {
            slot: Some(slot.slot_name.clone()),
            title: Some("Mendly check-in".to_string()),
            body: Some(reminder_body(&slot.slot_name).to_string()),
        });
        enqueue(pool, &slot.user_id, &reminder, at).await?;
        queued += 1;
    }

    for candidate in NotificationQueueRepository::positive_message_candidates(pool).await? {
        let interval = i64::from(candidate.positive_notif_interval_minutes.max(1));
        let message = QueuedNotification::PositiveMessage(PositiveMessagePayload {
            title: Some(DEFAULT_TITLE.to_string()),
            body: Some(pick_affirmation().to_string()),
            kind: None,
        });
        enqueue(pool, &candidate.user_id, &message, now + Duration::minutes(interval)).await?;
        queued += 1;
    }

    if queued > 0 {
        tracing::info!("Planner queued {} notifications", queued);
    }
    Ok(queued)
}
