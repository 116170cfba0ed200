use chrono::{Duration, NaiveDateTime, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;

use crate::config::JwtConfig;
use crate::db::models::User;
use crate::db::{PasswordResetRepository, UserRepository};
use crate::error::{AppError, AppResult};
use crate::services::mailer::{self, Mailer};

const BCRYPT_COST: u32 = if cfg!(test) { 4 } else { bcrypt::DEFAULT_COST };
const RESET_CODE_LEN: usize = 6;

pub const RESET_START_MESSAGE: &str = "If this email is registered, a code was sent.";
pub const RESET_INVALID: &str = "Invalid or expired code.";
pub const RESET_EXPIRED: &str = "Code expired. Please request a new one.";
pub const RESET_MISMATCH: &str = "Incorrect code. Please try again.";
/// Wrong codes tolerated before the entry is discarded.
pub const MAX_RESET_ATTEMPTS: i64 = 5;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub exp: usize,
    pub iat: usize,
}

pub struct AuthService;

impl AuthService {
    pub fn hash_password(password: &str) -> AppResult<String> {
        bcrypt::hash(password, BCRYPT_COST)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))
    }

    /// A malformed stored hash counts as a mismatch.
    pub fn verify_password(password: &str, hash: &str) -> bool {
        bcrypt::verify(password, hash).unwrap_or(false)
    }

    /// Create a signed session token for a user
    pub fn create_jwt(config: &JwtConfig, user_id: &str, username: Option<&str>) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(config.expiration_hours);
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.map(str::to_string),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )?;
        Ok(token)
    }

    /// Decode and validate a JWT, returning the claims
    pub fn decode_jwt(config: &JwtConfig, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Resolve the user a token belongs to. A token for a deleted or
    /// unknown user is unauthorized.
    pub async fn get_user_from_token(
        pool: &SqlitePool,
        config: &JwtConfig,
        token: &str,
    ) -> AppResult<User> {
        let claims = Self::decode_jwt(config, token)?;
        if claims.sub.is_empty() {
            return Err(AppError::Unauthorized);
        }
        UserRepository::find_by_id(pool, &claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    // ========================================================================
    // Password reset
    // ========================================================================

    pub fn generate_reset_code() -> String {
        let mut rng = rand::thread_rng();
        (0..RESET_CODE_LEN)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    pub fn hash_reset_code(code: &str) -> String {
        hex::encode(Sha256::digest(code.trim().as_bytes()))
    }

    /// Issue and mail a reset code if the email belongs to a user. Unknown
    /// emails are a silent no-op.
    pub async fn start_password_reset(
        pool: &SqlitePool,
        mailer: &dyn Mailer,
        email: &str,
        ttl_minutes: i64,
        now: NaiveDateTime,
    ) -> AppResult<()> {
        let email = email.trim().to_lowercase();

        if UserRepository::find_by_email(pool, &email).await?.is_none() {
            tracing::info!("Password reset requested for unknown email {}", email);
            return Ok(());
        }

        let code = Self::generate_reset_code();
        let expires_at = now + Duration::minutes(ttl_minutes);
        PasswordResetRepository::upsert(pool, &email, &Self::hash_reset_code(&code), expires_at)
            .await?;

        let text = format!(
            "Your Mendly password reset code is: {}\n\nThis code is valid for {} minutes.",
            code, ttl_minutes
        );
        mailer::send_best_effort(mailer, &email, "Mendly – Password Reset Code", &text).await;
        Ok(())
    }

    /// Check a reset code and set the new password.
    pub async fn verify_password_reset(
        pool: &SqlitePool,
        email: &str,
        code: &str,
        new_password: &str,
        now: NaiveDateTime,
    ) -> AppResult<()> {
        let email = email.trim().to_lowercase();

        let entry = PasswordResetRepository::find(pool, &email)
            .await?
            .ok_or_else(|| AppError::BadRequest(RESET_INVALID.to_string()))?;

        if entry.is_expired(now) {
            PasswordResetRepository::delete(pool, &email).await?;
            return Err(AppError::BadRequest(RESET_EXPIRED.to_string()));
        }

        if entry.code_hash != Self::hash_reset_code(code) {
            let attempts = PasswordResetRepository::record_failed_attempt(pool, &email).await?;
            if attempts >= MAX_RESET_ATTEMPTS {
                PasswordResetRepository::delete(pool, &email).await?;
                tracing::warn!("Reset code for {} discarded after {} wrong attempts", email, attempts);
                return Err(AppError::BadRequest(RESET_INVALID.to_string()));
            }
            return Err(AppError::BadRequest(RESET_MISMATCH.to_string()));
        }

        let user = UserRepository::find_by_email(pool, &email)
            .await?
            .ok_or_else(|| AppError::BadRequest(RESET_INVALID.to_string()))?;
        let hash = Self::hash_password(new_password)?;
        UserRepository::update_password(pool, &user.id, &hash).await?;
        PasswordResetRepository::delete(pool, &email).await?;

        tracing::info!("Password reset completed for user {}", user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::UserRole;
    use crate::db::repository::user::tests::seed_user;
    use crate::db::testing::test_pool;
    use crate::services::mailer::testing::RecordingMailer;

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            expiration_hours: 1,
        }
    }

    fn mailed_code(mailer: &RecordingMailer) -> String {
        let (_, _, text) = mailer.sent().pop().expect("mail sent");
        text.split("code is: ")
            .nth(1)
            .and_then(|rest| rest.get(..RESET_CODE_LEN))
            .expect("code in mail")
            .to_string()
    }

    #[test]
    fn jwt_round_trip_keeps_subject_and_username() {
        let config = jwt_config();
        let token = AuthService::create_jwt(&config, "user-1", Some("alice")).unwrap();
        let claims = AuthService::decode_jwt(&config, &token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username.as_deref(), Some("alice"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn jwt_with_other_secret_is_rejected() {
        let token = AuthService::create_jwt(&jwt_config(), "user-1", None).unwrap();
        let other = JwtConfig {
            secret: "other".into(),
            expiration_hours: 1,
        };
        assert!(matches!(
            AuthService::decode_jwt(&other, &token),
            Err(AppError::Jwt(_))
        ));
    }

    #[test]
    fn password_hash_verifies() {
        let hash = AuthService::hash_password("secret1").unwrap();
        assert!(AuthService::verify_password("secret1", &hash));
        assert!(!AuthService::verify_password("secret2", &hash));
        assert!(!AuthService::verify_password("secret1", "not-a-hash"));
    }

    #[test]
    fn reset_codes_are_six_digits() {
        let code = AuthService::generate_reset_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn reset_flow_success_and_single_use() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice", UserRole::Regular).await;
        let mailer = RecordingMailer::default();
        let now = Utc::now().naive_utc();

        AuthService::start_password_reset(&pool, &mailer, "ALICE@example.com", 10, now)
            .await
            .unwrap();
        let code = mailed_code(&mailer);

        let wrong = if code == "000000" { "111111" } else { "000000" };
        let err = AuthService::verify_password_reset(&pool, &user.email, wrong, "newpass", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == RESET_MISMATCH));

        AuthService::verify_password_reset(&pool, &user.email, &code, "newpass", now)
            .await
            .unwrap();
        let updated = UserRepository::find_by_id(&pool, &user.id).await.unwrap().unwrap();
        assert!(AuthService::verify_password("newpass", &updated.password_hash));

        let err = AuthService::verify_password_reset(&pool, &user.email, &code, "again1", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == RESET_INVALID));
    }

    #[tokio::test]
    async fn repeated_wrong_codes_discard_the_entry() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice", UserRole::Regular).await;
        let mailer = RecordingMailer::default();
        let now = Utc::now().naive_utc();

        AuthService::start_password_reset(&pool, &mailer, &user.email, 10, now)
            .await
            .unwrap();
        let code = mailed_code(&mailer);
        let wrong = if code == "000000" { "111111" } else { "000000" };

        for _ in 1..MAX_RESET_ATTEMPTS {
            let err = AuthService::verify_password_reset(&pool, &user.email, wrong, "newpass", now)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::BadRequest(ref m) if m == RESET_MISMATCH));
        }
        let err = AuthService::verify_password_reset(&pool, &user.email, wrong, "newpass", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == RESET_INVALID));
        assert!(PasswordResetRepository::find(&pool, &user.email)
            .await
            .unwrap()
            .is_none());

        let err = AuthService::verify_password_reset(&pool, &user.email, &code, "newpass", now)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == RESET_INVALID));
    }

    #[tokio::test]
    async fn expired_code_is_removed() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice", UserRole::Regular).await;
        let mailer = RecordingMailer::default();
        let now = Utc::now().naive_utc();

        AuthService::start_password_reset(&pool, &mailer, &user.email, 10, now)
            .await
            .unwrap();
        let code = mailed_code(&mailer);

        let later = now + Duration::minutes(11);
        let err = AuthService::verify_password_reset(&pool, &user.email, &code, "newpass", later)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == RESET_EXPIRED));
        assert!(PasswordResetRepository::find(&pool, &user.email)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unknown_email_sends_nothing() {
        let pool = test_pool().await;
        let mailer = RecordingMailer::default();
        AuthService::start_password_reset(&pool, &mailer, "nobody@example.com", 10, Utc::now().naive_utc())
            .await
            .unwrap();
        assert!(mailer.sent().is_empty());
    }
}
