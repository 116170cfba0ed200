use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::*;
use crate::error::{unique_violation, AppError, AppResult};

pub struct PsychologistRepository;

const LISTING_SELECT: &str = r#"
    SELECT
        u.id AS user_id, u.username, u.email,
        p.specialty, p.workplace, p.city, p.bio,
        p.years_experience, p.license_number
    FROM users u
    LEFT JOIN psychologist_profiles p ON p.user_id = u.id
    WHERE u.role = 'psychologist' AND u.is_deleted = 0
"#;

impl PsychologistRepository {
    pub async fn find_profile(
        pool: &SqlitePool,
        user_id: &str,
    ) -> AppResult<Option<PsychologistProfile>> {
        sqlx::query_as::<_, PsychologistProfile>(
            r#"
            SELECT user_id, specialty, workplace, city, bio, years_experience,
                   license_number, created_at, updated_at
            FROM psychologist_profiles
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Insert or replace the editable fields of a profile.
    /// A license number already used by another profile is a 400.
    pub async fn upsert_profile(
        pool: &SqlitePool,
        user_id: &str,
        input: PsychologistProfileInput,
    ) -> AppResult<PsychologistProfile> {
        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, PsychologistProfile>(
            r#"
            INSERT INTO psychologist_profiles (
                user_id, specialty, workplace, city, bio, years_experience,
                license_number, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                specialty = excluded.specialty,
                workplace = excluded.workplace,
                city = excluded.city,
                bio = excluded.bio,
                years_experience = excluded.years_experience,
                license_number = excluded.license_number,
                updated_at = excluded.updated_at
            RETURNING user_id, specialty, workplace, city, bio, years_experience,
                      license_number, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(input.specialty)
        .bind(input.workplace)
        .bind(input.city)
        .bind(input.bio)
        .bind(input.years_experience)
        .bind(input.license_number)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(|e| unique_violation(e, "License number already in use"))
    }

    pub async fn license_taken(pool: &SqlitePool, license_number: &str) -> AppResult<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM psychologist_profiles WHERE license_number = ?")
                .bind(license_number)
                .fetch_one(pool)
                .await
                .map_err(AppError::Database)?;
        Ok(count > 0)
    }

    pub async fn list(pool: &SqlitePool) -> AppResult<Vec<PsychologistListing>> {
        let sql = format!("{LISTING_SELECT} ORDER BY u.username");
        sqlx::query_as::<_, PsychologistListing>(&sql)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn find_listing(
        pool: &SqlitePool,
        user_id: &str,
    ) -> AppResult<Option<PsychologistListing>> {
        let sql = format!("{LISTING_SELECT} AND u.id = ?");
        sqlx::query_as::<_, PsychologistListing>(&sql)
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }
}
