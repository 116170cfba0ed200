use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::Recommendation;
use crate::error::{AppError, AppResult};

pub struct RecommendationRepository;

impl RecommendationRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        rec_type: &str,
        title: &str,
    ) -> AppResult<Recommendation> {
        let rec_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, Recommendation>(
            r#"
            INSERT INTO recommendations (rec_id, user_id, rec_type, title, user_action, shown_at)
            VALUES (?, ?, ?, ?, NULL, ?)
            RETURNING rec_id, user_id, rec_type, title, user_action, shown_at
            "#,
        )
        .bind(rec_id)
        .bind(user_id)
        .bind(rec_type)
        .bind(title)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn recent(pool: &SqlitePool, user_id: &str, limit: i64) -> AppResult<Vec<Recommendation>> {
        sqlx::query_as::<_, Recommendation>(
            r#"
            SELECT rec_id, user_id, rec_type, title, user_action, shown_at
            FROM recommendations
            WHERE user_id = ?
            ORDER BY shown_at DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
