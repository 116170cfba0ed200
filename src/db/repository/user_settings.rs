use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

pub struct UserSettingsRepository;

const SETTINGS_COLUMNS: &str = r#"
    user_id, checkin_frequency, motivation_enabled, positive_notif_enabled,
    positive_notif_interval_minutes, last_phq2_date, last_photo_memory_date,
    created_at, updated_at
"#;

/// A requested check-in slot, validated by the caller.
#[derive(Debug, Clone, Copy)]
pub struct SlotInput {
    pub slot: SlotName,
    pub hour: i32,
    pub minute: i32,
    pub enabled: bool,
}

impl UserSettingsRepository {
    /// Settings row for the user, created with defaults on first access.
    pub async fn get_or_create(pool: &SqlitePool, user_id: &str) -> AppResult<UserSettings> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO user_settings (user_id, created_at, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        let sql = format!("SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE user_id = ?");
        sqlx::query_as::<_, UserSettings>(&sql)
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn update_positive_notifications(
        pool: &SqlitePool,
        user_id: &str,
        enabled: bool,
        interval_minutes: i32,
    ) -> AppResult<UserSettings> {
        Self::get_or_create(pool, user_id).await?;
        let now = Utc::now().naive_utc();
        let sql = format!(
            r#"
            UPDATE user_settings
            SET positive_notif_enabled = ?, positive_notif_interval_minutes = ?, updated_at = ?
            WHERE user_id = ?
            RETURNING {SETTINGS_COLUMNS}
            "#
        );
        sqlx::query_as::<_, UserSettings>(&sql)
            .bind(enabled)
            .bind(interval_minutes)
            .bind(now)
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn set_last_phq2_date(
        pool: &SqlitePool,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<()> {
        Self::get_or_create(pool, user_id).await?;
        sqlx::query("UPDATE user_settings SET last_phq2_date = ?, updated_at = ? WHERE user_id = ?")
            .bind(date)
            .bind(Utc::now().naive_utc())
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn set_last_photo_memory_date(
        pool: &SqlitePool,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<()> {
        Self::get_or_create(pool, user_id).await?;
        sqlx::query(
            "UPDATE user_settings SET last_photo_memory_date = ?, updated_at = ? WHERE user_id = ?",
        )
        .bind(date)
        .bind(Utc::now().naive_utc())
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    /// The user's slots in morning, noon, evening order.
    pub async fn list_slots(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<CheckinSlot>> {
        let mut slots = sqlx::query_as::<_, CheckinSlot>(
            r#"
            SELECT user_id, slot_name, local_hour, local_minute, enabled
            FROM checkin_schedule
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        slots.sort_by_key(|s| SlotName::from_str(&s.slot_name).map(SlotName::ordinal));
        Ok(slots)
    }

    /// Replace the user's whole schedule in one transaction.
    pub async fn replace_slots(
        pool: &SqlitePool,
        user_id: &str,
        slots: &[SlotInput],
    ) -> AppResult<Vec<CheckinSlot>> {
        let mut tx = pool.begin().await.map_err(AppError::Database)?;

        sqlx::query("DELETE FROM checkin_schedule WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;

        for slot in slots {
            sqlx::query(
                r#"
                INSERT INTO checkin_schedule (user_id, slot_name, local_hour, local_minute, enabled)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(user_id, slot_name) DO UPDATE SET
                    local_hour = excluded.local_hour,
                    local_minute = excluded.local_minute,
                    enabled = excluded.enabled
                "#,
            )
            .bind(user_id)
            .bind(slot.slot.as_str())
            .bind(slot.hour)
            .bind(slot.minute)
            .bind(slot.enabled)
            .execute(&mut *tx)
            .await
            .map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Self::list_slots(pool, user_id).await
    }
}
