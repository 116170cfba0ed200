use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::{DevicePlatform, RegisterDeviceToken};
use crate::db::DeviceTokenRepository;
use crate::error::{AppError, AppResult};
use crate::routes::auth::AuthUser;
use crate::routes::check_len;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/register", post(register_device))
}

#[derive(Debug, Deserialize)]
pub struct RegisterDeviceRequest {
    pub fcm_token: String,
    pub platform: String,
    pub app_version: Option<String>,
}

/// Register or refresh the caller's push token.
async fn register_device(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<RegisterDeviceRequest>,
) -> AppResult<Json<Value>> {
    let platform = DevicePlatform::from_str(&request.platform)
        .ok_or_else(|| AppError::BadRequest("Invalid platform".to_string()))?;
    check_len("fcm_token", &request.fcm_token, 1, 4096)?;

    let device = DeviceTokenRepository::register(
        &state.db,
        RegisterDeviceToken {
            user_id: user.id.clone(),
            platform,
            fcm_token: request.fcm_token,
            app_version: request.app_version,
        },
    )
    .await?;

    tracing::info!("Device {} registered for user {}", device.token_id, user.id);
    Ok(Json(json!({ "ok": true })))
}
