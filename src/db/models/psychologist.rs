use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PsychologistProfile {
    pub user_id: String,
    pub specialty: Option<String>,
    pub workplace: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
    pub license_number: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Editable part of a psychologist profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PsychologistProfileInput {
    pub specialty: Option<String>,
    pub workplace: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
    pub license_number: Option<String>,
}

/// Directory row: a psychologist account joined with its (optional) profile.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PsychologistListing {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub specialty: Option<String>,
    pub workplace: Option<String>,
    pub city: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
    pub license_number: Option<String>,
}
