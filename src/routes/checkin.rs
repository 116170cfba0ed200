use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::models::{CheckinSlot, SlotName};
use crate::db::repository::user_settings::SlotInput;
use crate::db::UserSettingsRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::check_range;
use crate::services::checkin::{self, CheckinInput};
use crate::services::scoring::{MAX_SCORE, MIN_SCORE};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_checkin))
        .route("/schedule", axum::routing::get(get_schedule).put(replace_schedule))
}

#[derive(Debug, Deserialize)]
pub struct CheckinRequest {
    pub score: Option<i32>,
    pub label: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckinResponse {
    pub saved: bool,
    pub streak_days: i64,
    pub avg_7d: Option<f64>,
    pub avg_14d: Option<f64>,
    pub avg_30d: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SlotDto {
    pub slot: String,
    pub hour: i32,
    pub minute: i32,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl From<CheckinSlot> for SlotDto {
    fn from(slot: CheckinSlot) -> Self {
        SlotDto {
            slot: slot.slot_name,
            hour: slot.local_hour,
            minute: slot.local_minute,
            enabled: slot.enabled,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub slots: Vec<SlotDto>,
}

async fn create_checkin(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CheckinRequest>,
) -> AppResult<(StatusCode, Json<CheckinResponse>)> {
    check_range("score", request.score, MIN_SCORE, MAX_SCORE)?;

    let (entry, stats) = checkin::record_checkin(
        &state.db,
        &user.id,
        CheckinInput {
            score: request.score,
            label: request.label,
            note: request.note,
        },
        Utc::now().naive_utc(),
    )
    .await?;

    tracing::info!("Check-in {} saved for user {} (score {})", entry.id, user.id, entry.score);
    Ok((
        StatusCode::CREATED,
        Json(CheckinResponse {
            saved: true,
            streak_days: stats.streak_days,
            avg_7d: stats.avg_7d,
            avg_14d: stats.avg_14d,
            avg_30d: stats.avg_30d,
        }),
    ))
}

async fn get_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<SlotDto>>> {
    let slots = UserSettingsRepository::list_slots(&state.db, &user.id).await?;
    Ok(Json(slots.into_iter().map(SlotDto::from).collect()))
}

/// Replace all reminder slots. Each slot name may appear once.
async fn replace_schedule(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<ScheduleRequest>,
) -> AppResult<Json<Vec<SlotDto>>> {
    let mut inputs: Vec<SlotInput> = Vec::with_capacity(request.slots.len());
    for dto in &request.slots {
        let slot = SlotName::from_str(dto.slot.trim()).ok_or_else(|| {
            AppError::Validation("slot must be one of morning, noon, evening".to_string())
        })?;
        check_range("hour", Some(dto.hour), 0, 23)?;
        check_range("minute", Some(dto.minute), 0, 59)?;
        if inputs.iter().any(|i| i.slot == slot) {
            return Err(AppError::BadRequest(format!("Duplicate slot: {}", slot.as_str())));
        }
        inputs.push(SlotInput {
            slot,
            hour: dto.hour,
            minute: dto.minute,
            enabled: dto.enabled,
        });
    }

    let slots = UserSettingsRepository::replace_slots(&state.db, &user.id, &inputs).await?;
    tracing::info!("Check-in schedule updated for user {} ({} slots)", user.id, slots.len());
    Ok(Json(slots.into_iter().map(SlotDto::from).collect()))
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;

    use crate::db::models::UserRole;
    use crate::routes::testing::TestApp;

    #[tokio::test]
    async fn checkin_returns_created_with_stats() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice", UserRole::Regular).await;

        let (status, body) = app
            .send("POST", "/checkin", Some(&token), Some(json!({"label": "calm"})))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["saved"], true);
        assert_eq!(body["streak_days"], 1);
        assert_eq!(body["avg_7d"], 7.0);
    }

    #[tokio::test]
    async fn out_of_range_score_is_rejected() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice", UserRole::Regular).await;
        let (status, _) = app
            .send("POST", "/checkin", Some(&token), Some(json!({"score": 11})))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn schedule_is_replaced_and_ordered() {
        let app = TestApp::new().await;
        let (_, token) = app.user("alice", UserRole::Regular).await;

        let (status, body) = app
            .send(
                "PUT",
                "/checkin/schedule",
                Some(&token),
                Some(json!({"slots": [
                    {"slot": "evening", "hour": 20, "minute": 30},
                    {"slot": "morning", "hour": 8, "minute": 0, "enabled": false}
                ]})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["slot"], "morning");
        assert_eq!(body[0]["enabled"], false);
        assert_eq!(body[1]["slot"], "evening");

        let (status, _) = app
            .send(
                "PUT",
                "/checkin/schedule",
                Some(&token),
                Some(json!({"slots": [{"slot": "night", "hour": 1, "minute": 0}]})),
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, listed) = app.send("GET", "/checkin/schedule", Some(&token), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }
}
