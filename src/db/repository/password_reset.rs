use chrono::{NaiveDateTime, Utc};
use sqlx::SqlitePool;

use crate::db::models::PasswordResetCode;
use crate::error::{AppError, AppResult};

/// Persisted reset codes, one live entry per email.
pub struct PasswordResetRepository;

impl PasswordResetRepository {
    /// Store (or replace) the code digest for `email`, resetting the
    /// attempt counter.
    pub async fn upsert(
        pool: &SqlitePool,
        email: &str,
        code_hash: &str,
        expires_at: NaiveDateTime,
    ) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO password_reset_codes (email, code_hash, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(email) DO UPDATE SET
                code_hash = excluded.code_hash,
                expires_at = excluded.expires_at,
                attempts = 0,
                created_at = excluded.created_at
            "#,
        )
        .bind(email)
        .bind(code_hash)
        .bind(expires_at)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
        Ok(())
    }

    pub async fn find(pool: &SqlitePool, email: &str) -> AppResult<Option<PasswordResetCode>> {
        sqlx::query_as::<_, PasswordResetCode>(
            "SELECT email, code_hash, expires_at, attempts FROM password_reset_codes WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Count one wrong code and return the new total.
    pub async fn record_failed_attempt(pool: &SqlitePool, email: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE password_reset_codes SET attempts = attempts + 1
            WHERE email = ?
            RETURNING attempts
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
        .map(|attempts| attempts.unwrap_or(0))
    }

    pub async fn delete(pool: &SqlitePool, email: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM password_reset_codes WHERE email = ?")
            .bind(email)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
