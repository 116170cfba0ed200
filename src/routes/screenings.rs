use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::UserSettingsRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::check_range;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/phq2", post(submit_phq2))
        .route("/status", get(status))
        .route("/photo-popup-seen", post(photo_popup_seen))
}

#[derive(Debug, Deserialize)]
pub enum ScreeningType {
    #[serde(rename = "PHQ-2")]
    Phq2,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phq2Submission {
    #[serde(rename = "type")]
    pub kind: ScreeningType,
    pub total_score: i32,
    pub answers: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct ScreeningStatus {
    pub last_phq2_date: Option<NaiveDate>,
    pub last_photo_memory_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct PopupSeenResponse {
    pub ok: bool,
    pub last_photo_memory_date: NaiveDate,
}

/// Only the date of the last screening is kept.
async fn submit_phq2(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(submission): Json<Phq2Submission>,
) -> AppResult<StatusCode> {
    check_range("totalScore", Some(submission.total_score), 0, 6)?;
    if submission.answers.iter().any(|a| !(0..=3).contains(a)) {
        return Err(AppError::BadRequest("Invalid PHQ-2 answers".to_string()));
    }

    let today = Utc::now().date_naive();
    UserSettingsRepository::set_last_phq2_date(&state.db, &user.id, today).await?;
    tracing::debug!("PHQ-2 ({:?}) recorded for user {}", submission.kind, user.id);
    Ok(StatusCode::NO_CONTENT)
}

async fn status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<ScreeningStatus>> {
    let settings = UserSettingsRepository::get_or_create(&state.db, &user.id).await?;
    Ok(Json(ScreeningStatus {
        last_phq2_date: settings.last_phq2_date,
        last_photo_memory_date: settings.last_photo_memory_date,
    }))
}

async fn photo_popup_seen(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<PopupSeenResponse>> {
    let today = Utc::now().date_naive();
    UserSettingsRepository::set_last_photo_memory_date(&state.db, &user.id, today).await?;
    Ok(Json(PopupSeenResponse {
        ok: true,
        last_photo_memory_date: today,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use http::StatusCode;
    use serde_json::{json, Value};

    use crate::db::models::UserRole;
    use crate::routes::testing::TestApp;

    #[tokio::test]
    async fn phq2_and_popup_update_status() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice", UserRole::Regular).await;
        let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

        let (_, body) = app.send("GET", "/screenings/status", Some(&token), None).await;
        assert_eq!(body["last_phq2_date"], Value::Null);

        let (status, _) = app
            .send(
                "POST",
                "/screenings/phq2",
                Some(&token),
                Some(json!({"type": "PHQ-2", "totalScore": 3, "answers": [1, 2]})),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app
            .send("POST", "/screenings/photo-popup-seen", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);

        let (_, body) = app.send("GET", "/screenings/status", Some(&token), None).await;
        assert_eq!(body["last_phq2_date"], today.as_str());
        assert_eq!(body["last_photo_memory_date"], today.as_str());
    }

    #[tokio::test]
    async fn phq2_rejects_out_of_range_answers() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice", UserRole::Regular).await;

        let (status, body) = app
            .send(
                "POST",
                "/screenings/phq2",
                Some(&token),
                Some(json!({"type": "PHQ-2", "totalScore": 4, "answers": [4, 0]})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid PHQ-2 answers");

        let (status, _) = app
            .send(
                "POST",
                "/screenings/phq2",
                Some(&token),
                Some(json!({"type": "PHQ-2", "totalScore": 7, "answers": [3, 3]})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
