use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Recommendation {
    pub rec_id: String,
    pub user_id: String,
    pub rec_type: String,
    pub title: String,
    pub user_action: Option<String>,
    pub shown_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionPurpose {
    Chat,
    Summary,
}

impl InteractionPurpose {
    pub fn as_str(self) -> &'static str {
        match self {
            InteractionPurpose::Chat => "chat",
            InteractionPurpose::Summary => "summary",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AiInteraction {
    pub interaction_id: String,
    pub user_id: String,
    pub purpose: String,
    pub input_text: String,
    pub output_text: String,
    pub created_at: NaiveDateTime,
}
