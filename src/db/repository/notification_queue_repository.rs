use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

/// Repository for the push notification queue.
///
/// Implementation notes:
/// - Jobs move `pending -> sent | failed` exactly once; rows are never deleted.
/// - Status updates are unconditional per row. Only one worker task runs per
///   process, so there is no claim step.
/// - `scheduled_at`/`sent_at` are bound from Rust so text comparisons against
///   `now` stay in one timestamp format.
pub struct NotificationQueueRepository;

const JOB_COLUMNS: &str = r#"
    job_id, user_id, token_id, purpose, payload_json,
    scheduled_at, sent_at, status, error, created_at
"#;

impl NotificationQueueRepository {
    /// Enqueue a new pending job.
    pub async fn create(
        pool: &SqlitePool,
        job: CreateNotificationJob,
    ) -> AppResult<NotificationJob> {
        let job_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let sql = format!(
            r#"
            INSERT INTO notification_queue (
                job_id, user_id, token_id, purpose, payload_json,
                scheduled_at, sent_at, status, error, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, NULL, 'pending', NULL, ?)
            RETURNING {JOB_COLUMNS}
            "#
        );

        sqlx::query_as::<_, NotificationJob>(&sql)
            .bind(job_id)
            .bind(job.user_id)
            .bind(job.token_id)
            .bind(job.purpose)
            .bind(job.payload_json)
            .bind(job.scheduled_at)
            .bind(now)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Up to `limit` pending jobs due at `now`, restricted to `purposes`.
    /// Jobs whose user has an active device come first, then oldest schedule
    /// first, so undeliverable jobs never fill a batch ahead of deliverable ones.
    pub async fn fetch_due(
        pool: &SqlitePool,
        now: NaiveDateTime,
        limit: i64,
        purposes: &[&str],
    ) -> AppResult<Vec<NotificationJob>> {
        if limit <= 0 || purposes.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; purposes.len()].join(", ");
        let sql = format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM notification_queue q
            WHERE status = 'pending'
              AND scheduled_at <= ?
              AND purpose IN ({placeholders})
            ORDER BY EXISTS (
                         SELECT 1 FROM user_device_tokens t
                         WHERE t.user_id = q.user_id AND t.is_active = 1
                     ) DESC,
                     scheduled_at ASC
            LIMIT ?
            "#
        );

        let mut query = sqlx::query_as::<_, NotificationJob>(&sql).bind(now);
        for purpose in purposes {
            query = query.bind(*purpose);
        }

        query
            .bind(limit)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_id(pool: &SqlitePool, job_id: &str) -> AppResult<Option<NotificationJob>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM notification_queue WHERE job_id = ?");
        sqlx::query_as::<_, NotificationJob>(&sql)
            .bind(job_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn mark_sent(pool: &SqlitePool, job_id: &str, now: NaiveDateTime) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_queue SET status = 'sent', sent_at = ?, error = NULL WHERE job_id = ?",
        )
        .bind(now)
        .bind(job_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn mark_failed(
        pool: &SqlitePool,
        job_id: &str,
        error: &str,
        now: NaiveDateTime,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE notification_queue SET status = 'failed', sent_at = ?, error = ? WHERE job_id = ?",
        )
        .bind(now)
        .bind(error)
        .bind(job_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    /// Enabled check-in slots of users with an active device and no pending
    /// reminder for that slot.
    pub async fn unplanned_checkin_slots(pool: &SqlitePool) -> AppResult<Vec<UnplannedSlot>> {
        sqlx::query_as::<_, UnplannedSlot>(
            r#"
            SELECT s.user_id, s.slot_name, s.local_hour, s.local_minute
            FROM checkin_schedule s
            JOIN users u ON u.id = s.user_id AND u.is_deleted = 0
            WHERE s.enabled = 1
              AND EXISTS (
                  SELECT 1 FROM user_device_tokens t
                  WHERE t.user_id = s.user_id AND t.is_active = 1
              )
              AND NOT EXISTS (
                  SELECT 1 FROM notification_queue q
                  WHERE q.user_id = s.user_id
                    AND q.status = 'pending'
                    AND q.purpose = 'checkin_reminder'
                    AND json_extract(q.payload_json, '$.slot') = s.slot_name
              )
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Users with positive messages enabled (the default when no settings
    /// row exists), an active device and nothing pending.
    pub async fn positive_message_candidates(
        pool: &SqlitePool,
    ) -> AppResult<Vec<PositiveMessageCandidate>> {
        sqlx::query_as::<_, PositiveMessageCandidate>(
            r#"
            SELECT u.id AS user_id,
                   COALESCE(st.positive_notif_interval_minutes, 60) AS positive_notif_interval_minutes
            FROM users u
            LEFT JOIN user_settings st ON st.user_id = u.id
            WHERE u.is_deleted = 0
              AND COALESCE(st.positive_notif_enabled, 1) = 1
              AND EXISTS (
                  SELECT 1 FROM user_device_tokens t
                  WHERE t.user_id = u.id AND t.is_active = 1
              )
              AND NOT EXISTS (
                  SELECT 1 FROM notification_queue q
                  WHERE q.user_id = u.id
                    AND q.status = 'pending'
                    AND q.purpose = 'positive_message'
              )
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
