use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

pub struct AiInteractionRepository;

impl AiInteractionRepository {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        purpose: InteractionPurpose,
        input_text: &str,
        output_text: &str,
    ) -> AppResult<AiInteraction> {
        let interaction_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, AiInteraction>(
            r#"
            INSERT INTO ai_interactions (
                interaction_id, user_id, purpose, input_text, output_text, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            RETURNING interaction_id, user_id, purpose, input_text, output_text, created_at
            "#,
        )
        .bind(interaction_id)
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(input_text)
        .bind(output_text)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn latest(
        pool: &SqlitePool,
        user_id: &str,
        purpose: InteractionPurpose,
    ) -> AppResult<Option<AiInteraction>> {
        sqlx::query_as::<_, AiInteraction>(
            r#"
            SELECT interaction_id, user_id, purpose, input_text, output_text, created_at
            FROM ai_interactions
            WHERE user_id = ? AND purpose = ?
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(purpose.as_str())
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }
}
