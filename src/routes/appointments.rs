use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::db::models::{
    AppointmentDetails, AppointmentIntake, AppointmentStatus, CreateAppointment,
};
use crate::db::{AppointmentRepository, PsychologistRepository};
use crate::error::{AppError, AppResult};
use crate::routes::auth::{require_psychologist, require_regular, AuthUser};
use crate::services::mailer;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_appointment))
        .route("/intake", post(create_intake))
        .route("/intake/:intake_id", get(get_intake))
        .route("/mine", get(list_mine))
        .route("/psy", get(list_for_psychologist))
        .route("/:appointment_id/status", put(update_status))
}

const SETTABLE_STATUSES: &str = "[approved, canceled, completed, rejected]";

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub psychologist_user_id: String,
    pub answers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    pub psychologist_user_id: String,
    pub intake_id: Option<String>,
    pub start_at: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusFilter {
    pub status_filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub notes: Option<String>,
}

/// Accepts RFC 3339 (converted to UTC) or a naive ISO timestamp taken as UTC.
fn parse_start_at(value: &str) -> AppResult<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| AppError::Validation("start_at must be an ISO 8601 datetime".to_string()))
}

async fn ensure_psychologist_exists(state: &AppState, psychologist_user_id: &str) -> AppResult<()> {
    PsychologistRepository::find_listing(&state.db, psychologist_user_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Psychologist not found".to_string()))
}

async fn create_intake(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<IntakeRequest>,
) -> AppResult<Json<AppointmentIntake>> {
    require_regular(&user, "Only regular users can create intake")?;
    ensure_psychologist_exists(&state, &request.psychologist_user_id).await?;

    let answers_json = Value::Object(request.answers).to_string();
    let intake = AppointmentRepository::create_intake(
        &state.db,
        &user.id,
        &request.psychologist_user_id,
        &answers_json,
    )
    .await?;

    tracing::info!(
        "Intake {} created by {} for psychologist {}",
        intake.intake_id,
        user.id,
        intake.psychologist_user_id
    );
    Ok(Json(intake))
}

async fn create_appointment(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(request): Json<AppointmentRequest>,
) -> AppResult<Json<AppointmentDetails>> {
    require_regular(&user, "Only regular users can request appointments")?;
    let start_at = parse_start_at(&request.start_at)?;
    ensure_psychologist_exists(&state, &request.psychologist_user_id).await?;

    if let Some(intake_id) = &request.intake_id {
        let valid = AppointmentRepository::find_intake(&state.db, intake_id)
            .await?
            .map(|i| {
                i.client_user_id == user.id
                    && i.psychologist_user_id == request.psychologist_user_id
            })
            .unwrap_or(false);
        if !valid {
            return Err(AppError::BadRequest(
                "Invalid intake_id for this user/psychologist".to_string(),
            ));
        }
    }

    let appointment = AppointmentRepository::create(
        &state.db,
        CreateAppointment {
            client_user_id: user.id.clone(),
            psychologist_user_id: request.psychologist_user_id,
            intake_id: request.intake_id,
            start_at,
        },
    )
    .await?;

    tracing::info!("Appointment {} requested by {}", appointment.appointment_id, user.id);
    Ok(Json(appointment))
}

async fn list_mine(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<AppointmentDetails>>> {
    Ok(Json(
        AppointmentRepository::list_for_client(&state.db, &user.id).await?,
    ))
}

async fn list_for_psychologist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(filter): Query<StatusFilter>,
) -> AppResult<Json<Vec<AppointmentDetails>>> {
    require_psychologist(&user, "Only psychologists can view this")?;
    let status = filter.status_filter.as_deref().filter(|s| !s.is_empty());
    Ok(Json(
        AppointmentRepository::list_for_psychologist(&state.db, &user.id, status).await?,
    ))
}

async fn get_intake(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(intake_id): Path<String>,
) -> AppResult<Json<AppointmentIntake>> {
    require_psychologist(&user, "Only psychologists can view intakes")?;
    AppointmentRepository::find_intake(&state.db, &intake_id)
        .await?
        .filter(|i| i.psychologist_user_id == user.id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Intake not found".to_string()))
}

fn status_email(appointment: &AppointmentDetails, status: AppointmentStatus) -> Option<(String, String)> {
    let name = appointment.client_username.as_deref().unwrap_or("there");
    match status {
        AppointmentStatus::Approved => Some((
            "Your appointment has been approved".to_string(),
            format!(
                "Hello {},\n\nYour appointment request has been APPROVED.\n\nScheduled time:\n{}\n\nBest regards,\nMendly Team\n",
                name,
                appointment.start_at.format("%Y-%m-%d %H:%M UTC")
            ),
        )),
        AppointmentStatus::Rejected => Some((
            "Your appointment request was declined".to_string(),
            format!(
                "Hello {},\n\nUnfortunately, your appointment request was DECLINED.\n\nYou may request another appointment.\n\nBest regards,\nMendly Team\n",
                name
            ),
        )),
        _ => None,
    }
}

/// Psychologist decision on a request. Approvals and rejections are mailed
/// to the client.
async fn update_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(appointment_id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> AppResult<Json<AppointmentDetails>> {
    require_psychologist(&user, "Only psychologists can update status")?;
    let status = AppointmentStatus::from_str(&request.status)
        .filter(|s| s.is_settable_by_psychologist())
        .ok_or_else(|| {
            AppError::BadRequest(format!("Invalid status. Allowed: {}", SETTABLE_STATUSES))
        })?;

    let updated = AppointmentRepository::update_status(
        &state.db,
        &appointment_id,
        &user.id,
        status,
        request.notes.as_deref(),
    )
    .await?;
    if !updated {
        return Err(AppError::NotFound("Appointment not found".to_string()));
    }

    let appointment = AppointmentRepository::find(&state.db, &appointment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))?;

    tracing::info!(
        "Appointment {} set to {} by {}",
        appointment_id,
        status.as_str(),
        user.id
    );

    if let (Some(email), Some((subject, body))) =
        (appointment.client_email.as_deref(), status_email(&appointment, status))
    {
        mailer::send_best_effort(state.mailer.as_ref(), email, &subject, &body).await;
    }

    Ok(Json(appointment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde_json::json;

    use crate::db::models::UserRole;
    use crate::routes::testing::TestApp;

    #[test]
    fn start_at_accepts_offsets_and_naive() {
        let with_offset = parse_start_at("2026-03-01T10:00:00+02:00").unwrap();
        assert_eq!(with_offset.to_string(), "2026-03-01 08:00:00");
        let naive = parse_start_at("2026-03-01T10:30").unwrap();
        assert_eq!(naive.to_string(), "2026-03-01 10:30:00");
        assert!(matches!(parse_start_at("next tuesday"), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn intake_appointment_and_approval_flow() {
        let app = TestApp::new().await;
        let (client, client_token) = app.user("client", UserRole::Regular).await;
        let (psy, psy_token) = app.user("drpsy", UserRole::Psychologist).await;

        let (status, intake) = app
            .send(
                "POST",
                "/appointments/intake",
                Some(&client_token),
                Some(json!({"psychologist_user_id": psy.id, "answers": {"reason": "sleep"}})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let intake_id = intake["intake_id"].as_str().unwrap().to_string();

        let (status, appt) = app
            .send(
                "POST",
                "/appointments",
                Some(&client_token),
                Some(json!({
                    "psychologist_user_id": psy.id,
                    "intake_id": intake_id,
                    "start_at": "2026-03-01T10:00:00Z"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(appt["status"], "requested");
        assert_eq!(appt["client_user_id"], client.id);
        let appt_id = appt["appointment_id"].as_str().unwrap().to_string();

        let (status, _) = app
            .send("GET", &format!("/appointments/intake/{}", intake_id), Some(&psy_token), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, listed) = app
            .send("GET", "/appointments/psy?status_filter=requested", Some(&psy_token), None)
            .await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, updated) = app
            .send(
                "PUT",
                &format!("/appointments/{}/status", appt_id),
                Some(&psy_token),
                Some(json!({"status": "approved", "notes": "See you"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "approved");

        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "client@example.com");
        assert_eq!(sent[0].1, "Your appointment has been approved");
        assert!(sent[0].2.contains("2026-03-01 10:00 UTC"));

        let (_, mine) = app.send("GET", "/appointments/mine", Some(&client_token), None).await;
        assert_eq!(mine[0]["status"], "approved");
    }

    #[tokio::test]
    async fn role_and_status_checks() {
        let app = TestApp::new().await;
        let (_, client_token) = app.user("client", UserRole::Regular).await;
        let (other, _) = app.user("other", UserRole::Regular).await;
        let (psy, psy_token) = app.user("drpsy", UserRole::Psychologist).await;

        let (status, body) = app
            .send(
                "POST",
                "/appointments/intake",
                Some(&psy_token),
                Some(json!({"psychologist_user_id": psy.id, "answers": {}})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["message"], "Only regular users can create intake");

        let (status, _) = app
            .send(
                "POST",
                "/appointments",
                Some(&client_token),
                Some(json!({"psychologist_user_id": other.id, "start_at": "2026-03-01T10:00:00Z"})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app
            .send(
                "POST",
                "/appointments",
                Some(&client_token),
                Some(json!({
                    "psychologist_user_id": psy.id,
                    "intake_id": "missing",
                    "start_at": "2026-03-01T10:00:00Z"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "Invalid intake_id for this user/psychologist");

        let (status, body) = app
            .send(
                "PUT",
                "/appointments/whatever/status",
                Some(&psy_token),
                Some(json!({"status": "requested"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"]["message"],
            "Invalid status. Allowed: [approved, canceled, completed, rejected]"
        );

        let (status, _) = app
            .send(
                "PUT",
                "/appointments/whatever/status",
                Some(&psy_token),
                Some(json!({"status": "canceled"})),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send("GET", "/appointments/psy", Some(&client_token), None)
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
