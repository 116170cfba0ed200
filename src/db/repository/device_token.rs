use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

pub struct DeviceTokenRepository;

impl DeviceTokenRepository {
    /// Register a device, idempotent on `fcm_token`.
    ///
    /// An existing row keeps its `token_id` and is re-pointed at the calling
    /// user, re-activated and its `last_seen` refreshed.
    pub async fn register(
        pool: &SqlitePool,
        device: RegisterDeviceToken,
    ) -> AppResult<UserDeviceToken> {
        let token_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        sqlx::query_as::<_, UserDeviceToken>(
            r#"
            INSERT INTO user_device_tokens (
                token_id, user_id, platform, fcm_token, app_version, last_seen, is_active
            ) VALUES (?, ?, ?, ?, ?, ?, 1)
            ON CONFLICT(fcm_token) DO UPDATE SET
                user_id = excluded.user_id,
                platform = excluded.platform,
                app_version = excluded.app_version,
                last_seen = excluded.last_seen,
                is_active = 1
            RETURNING token_id, user_id, platform, fcm_token, app_version, last_seen, is_active
            "#,
        )
        .bind(token_id)
        .bind(device.user_id)
        .bind(device.platform.as_str())
        .bind(device.fcm_token)
        .bind(device.app_version)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Most recently seen active token of a user.
    pub async fn find_latest_active(
        pool: &SqlitePool,
        user_id: &str,
    ) -> AppResult<Option<UserDeviceToken>> {
        sqlx::query_as::<_, UserDeviceToken>(
            r#"
            SELECT token_id, user_id, platform, fcm_token, app_version, last_seen, is_active
            FROM user_device_tokens
            WHERE user_id = ? AND is_active = 1
            ORDER BY last_seen DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn count_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_device_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .map_err(AppError::Database)
    }
}
