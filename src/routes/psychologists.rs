use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use crate::db::models::{ClientSummary, PsychologistListing, PsychologistSession};
use crate::db::{AppointmentRepository, PsychologistRepository};
use crate::error::{AppError, AppResult};
use crate::routes::auth::{require_psychologist, update_psychologist_profile, AuthUser};
use crate::AppState;

/// Public directory plus the psychologist dashboards. Mounted at the root.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/psychologists", get(list_psychologists))
        .route("/psychologists/:user_id", get(get_psychologist))
        .route("/psychologist-profile", put(update_psychologist_profile))
        .route("/psy/clients", get(list_clients))
        .route("/psy/appointments", get(list_sessions))
}

const PSYCHOLOGIST_ONLY: &str = "Psychologist access only";

async fn list_psychologists(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<PsychologistListing>>> {
    Ok(Json(PsychologistRepository::list(&state.db).await?))
}

async fn get_psychologist(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> AppResult<Json<PsychologistListing>> {
    PsychologistRepository::find_listing(&state.db, &user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Psychologist not found".to_string()))
}

async fn list_clients(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<ClientSummary>>> {
    require_psychologist(&user, PSYCHOLOGIST_ONLY)?;
    Ok(Json(
        AppointmentRepository::list_clients(&state.db, &user.id).await?,
    ))
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<PsychologistSession>>> {
    require_psychologist(&user, PSYCHOLOGIST_ONLY)?;
    Ok(Json(
        AppointmentRepository::list_sessions(&state.db, &user.id).await?,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use http::StatusCode;
    use serde_json::json;

    use crate::db::models::{CreateAppointment, UserRole};
    use crate::db::AppointmentRepository;
    use crate::routes::testing::TestApp;

    #[tokio::test]
    async fn directory_lists_psychologists_with_profiles() {
        let app = TestApp::new().await;
        let (psy, psy_token) = app.user("drpsy", UserRole::Psychologist).await;
        app.user("client", UserRole::Regular).await;

        let (status, _) = app
            .send(
                "PUT",
                "/psychologist-profile",
                Some(&psy_token),
                Some(json!({"specialty": "CBT", "city": "Tirana"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, list) = app.send("GET", "/psychologists", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let list = list.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["specialty"], "CBT");

        let (status, one) = app
            .send("GET", &format!("/psychologists/{}", psy.id), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one["city"], "Tirana");

        let (status, body) = app.send("GET", "/psychologists/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Psychologist not found");
    }

    #[tokio::test]
    async fn dashboards_are_psychologist_only() {
        let app = TestApp::new().await;
        let (client, client_token) = app.user("client", UserRole::Regular).await;
        let (psy, psy_token) = app.user("drpsy", UserRole::Psychologist).await;

        AppointmentRepository::create(
            &app.state.db,
            CreateAppointment {
                client_user_id: client.id.clone(),
                psychologist_user_id: psy.id.clone(),
                intake_id: None,
                start_at: NaiveDate::from_ymd_opt(2026, 3, 1)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
            },
        )
        .await
        .unwrap();

        let (status, clients) = app.send("GET", "/psy/clients", Some(&psy_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(clients[0]["username"], "client");
        assert_eq!(clients[0]["appointments_count"], 1);

        let (status, sessions) = app
            .send("GET", "/psy/appointments", Some(&psy_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sessions.as_array().unwrap().len(), 1);

        let (status, body) = app
            .send("GET", "/psy/clients", Some(&client_token), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "Psychologist access only");
    }
}
