use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::models::{InteractionPurpose, MoodSource, NewMoodEntry};
use crate::db::{AiInteractionRepository, MoodEntryRepository, RecommendationRepository};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::services::scoring::{self, Reply};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat))
}

const HISTORY_LIMIT: usize = 30;
const MOOD_NOTE_MESSAGES: usize = 10;
const TIP_REC_TYPE: &str = "tip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Text of the last `MOOD_NOTE_MESSAGES` user turns, current message included.
fn recent_user_note(history: &[ChatMessage], message: &str) -> String {
    let mut texts: Vec<&str> = history
        .iter()
        .filter(|m| m.role == ChatRole::User)
        .map(|m| m.content.as_str())
        .collect();
    texts.push(message);

    let start = texts.len().saturating_sub(MOOD_NOTE_MESSAGES);
    texts[start..].join("\n").trim().to_string()
}

async fn chat(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<ChatRequest>,
) -> AppResult<Json<ChatResponse>> {
    let start = request.history.len().saturating_sub(HISTORY_LIMIT);
    let history = &request.history[start..];

    let last_assistant = history
        .iter()
        .rev()
        .find(|m| m.role == ChatRole::Assistant)
        .map(|m| m.content.as_str());

    let reply = scoring::generate_reply(&request.message, last_assistant);
    let note = recent_user_note(history, &request.message);

    if let Err(e) = persist_chat_turn(&state.db, &user.id, &request.message, &note, &reply).await {
        tracing::warn!("Failed to persist chat turn for user {}: {:?}", user.id, e);
    }

    Ok(Json(ChatResponse { reply: reply.text }))
}

async fn persist_chat_turn(
    pool: &SqlitePool,
    user_id: &str,
    message: &str,
    note: &str,
    reply: &Reply,
) -> AppResult<()> {
    if !note.is_empty() {
        let (score, label) = scoring::estimate_mood(note);
        MoodEntryRepository::create(
            pool,
            NewMoodEntry {
                user_id: user_id.to_string(),
                score,
                label: Some(label.to_string()),
                note: Some(note.as_bytes().to_vec()),
                emojis_json: None,
                source: MoodSource::Chat,
                captured_at: Utc::now().naive_utc(),
            },
        )
        .await?;
    }

    AiInteractionRepository::create(pool, user_id, InteractionPurpose::Chat, message, &reply.text)
        .await?;
    RecommendationRepository::create(pool, user_id, TIP_REC_TYPE, reply.category.tip()).await?;
    Ok(())
}
