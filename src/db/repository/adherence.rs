use sqlx::SqlitePool;

use crate::db::models::AdherenceStats;
use crate::error::{AppError, AppResult};

pub struct AdherenceRepository;

impl AdherenceRepository {
    pub async fn find(pool: &SqlitePool, user_id: &str) -> AppResult<Option<AdherenceStats>> {
        sqlx::query_as::<_, AdherenceStats>(
            r#"
            SELECT user_id, streak_days, last_checkin_at, avg_7d, avg_14d, avg_30d, updated_at
            FROM adherence_stats
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Insert or overwrite the user's stats row.
    pub async fn upsert(pool: &SqlitePool, stats: &AdherenceStats) -> AppResult<AdherenceStats> {
        sqlx::query_as::<_, AdherenceStats>(
            r#"
            INSERT INTO adherence_stats (
                user_id, streak_days, last_checkin_at, avg_7d, avg_14d, avg_30d, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                streak_days = excluded.streak_days,
                last_checkin_at = excluded.last_checkin_at,
                avg_7d = excluded.avg_7d,
                avg_14d = excluded.avg_14d,
                avg_30d = excluded.avg_30d,
                updated_at = excluded.updated_at
            RETURNING user_id, streak_days, last_checkin_at, avg_7d, avg_14d, avg_30d, updated_at
            "#,
        )
        .bind(&stats.user_id)
        .bind(stats.streak_days)
        .bind(stats.last_checkin_at)
        .bind(stats.avg_7d)
        .bind(stats.avg_14d)
        .bind(stats.avg_30d)
        .bind(stats.updated_at)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }
}
