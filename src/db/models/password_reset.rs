use chrono::NaiveDateTime;
use sqlx::FromRow;

/// Persisted, expiring reset code keyed by (lower-cased) email.
/// Only the SHA-256 digest of the code is stored.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetCode {
    pub email: String,
    pub code_hash: String,
    pub expires_at: NaiveDateTime,
    /// Wrong codes submitted against this entry.
    pub attempts: i64,
}

impl PasswordResetCode {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        now > self.expires_at
    }
}
