use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::UserSettingsRepository;
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::check_range;
use crate::services::notifications::{self, PositiveMessagePayload, QueuedNotification};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/settings", get(get_settings).post(update_settings))
        .route("/send-test", post(send_test))
}

const MAX_FREQUENCY_MINUTES: i32 = 7 * 24 * 60;
const TEST_TITLE: &str = "Mendly • Test positive message";
const TEST_BODY: &str = "This is a test positive notification from Mendly 🌱";
const TEST_KIND: &str = "test_positive";

#[derive(Debug, Serialize, Deserialize)]
pub struct PositiveSettings {
    pub enabled: bool,
    pub frequency_minutes: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestNotificationRequest {
    pub body: Option<String>,
}

async fn get_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<PositiveSettings>> {
    let settings = UserSettingsRepository::get_or_create(&state.db, &user.id).await?;
    Ok(Json(PositiveSettings {
        enabled: settings.positive_notif_enabled,
        frequency_minutes: settings.positive_notif_interval_minutes,
    }))
}

async fn update_settings(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<PositiveSettings>,
) -> AppResult<Json<PositiveSettings>> {
    check_range(
        "frequency_minutes",
        Some(request.frequency_minutes),
        1,
        MAX_FREQUENCY_MINUTES,
    )?;

    let settings = UserSettingsRepository::update_positive_notifications(
        &state.db,
        &user.id,
        request.enabled,
        request.frequency_minutes,
    )
    .await?;

    Ok(Json(PositiveSettings {
        enabled: settings.positive_notif_enabled,
        frequency_minutes: settings.positive_notif_interval_minutes,
    }))
}

/// Queue one positive message due immediately.
async fn send_test(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    request: Option<Json<TestNotificationRequest>>,
) -> AppResult<StatusCode> {
    let body = request
        .and_then(|Json(r)| r.body)
        .filter(|b| !b.trim().is_empty())
        .unwrap_or_else(|| TEST_BODY.to_string());

    notifications::enqueue(
        &state.db,
        &user.id,
        &QueuedNotification::PositiveMessage(PositiveMessagePayload {
            title: Some(TEST_TITLE.to_string()),
            body: Some(body),
            kind: Some(TEST_KIND.to_string()),
        }),
        Utc::now().naive_utc(),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
