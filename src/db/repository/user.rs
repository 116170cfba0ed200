use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{unique_violation, AppError, AppResult};

// ============================================================================
// User Repository
// ============================================================================

pub struct UserRepository;

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, age, gender, role,
    is_deleted, created_at, updated_at
"#;

impl UserRepository {
    pub async fn create(pool: &SqlitePool, user: CreateUser) -> AppResult<User> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let sql = format!(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, age, gender, role,
                is_deleted, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(user.username)
            .bind(user.email.to_lowercase())
            .bind(user.password_hash)
            .bind(user.age)
            .bind(user.gender)
            .bind(user.role.as_str())
            .bind(now)
            .bind(now)
            .fetch_one(pool)
            .await
            .map_err(|e| unique_violation(e, "Username or email already in use"))
    }

    /// Active (not soft-deleted) user by id.
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ? AND is_deleted = 0");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<User>> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? AND is_deleted = 0");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Emails are stored lower-cased; the lookup lower-cases its input too.
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? AND is_deleted = 0");
        sqlx::query_as::<_, User>(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Whether `username` is taken by anyone other than `except_id`.
    pub async fn username_taken(
        pool: &SqlitePool,
        username: &str,
        except_id: Option<&str>,
    ) -> AppResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? AND id != ?")
                .bind(username)
                .bind(except_id.unwrap_or(""))
                .fetch_one(pool)
                .await
                .map_err(AppError::Database)?;
        Ok(count > 0)
    }

    pub async fn email_taken(
        pool: &SqlitePool,
        email: &str,
        except_id: Option<&str>,
    ) -> AppResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? AND id != ?")
                .bind(email.trim().to_lowercase())
                .bind(except_id.unwrap_or(""))
                .fetch_one(pool)
                .await
                .map_err(AppError::Database)?;
        Ok(count > 0)
    }

    pub async fn update_profile(
        pool: &SqlitePool,
        id: &str,
        username: &str,
        email: &str,
        age: Option<i32>,
        gender: Option<i32>,
    ) -> AppResult<User> {
        let now = Utc::now().naive_utc();
        let sql = format!(
            r#"
            UPDATE users
            SET username = ?, email = ?, age = ?, gender = ?, updated_at = ?
            WHERE id = ?
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .bind(email.to_lowercase())
            .bind(age)
            .bind(gender)
            .bind(now)
            .bind(id)
            .fetch_one(pool)
            .await
            .map_err(|e| unique_violation(e, "Username or email already in use"))
    }

    pub async fn update_password(pool: &SqlitePool, id: &str, password_hash: &str) -> AppResult<()> {
        let now = Utc::now().naive_utc();
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(now)
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
