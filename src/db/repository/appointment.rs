use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

pub struct AppointmentRepository;

const DETAILS_SELECT: &str = r#"
    SELECT
        a.appointment_id, a.client_user_id,
        u.username AS client_username, u.email AS client_email,
        a.psychologist_user_id, a.intake_id, a.start_at, a.status, a.notes,
        a.created_at, a.updated_at
    FROM appointments a
    JOIN users u ON u.id = a.client_user_id
"#;

impl AppointmentRepository {
    // ========================================================================
    // Intakes
    // ========================================================================

    pub async fn create_intake(
        pool: &SqlitePool,
        client_user_id: &str,
        psychologist_user_id: &str,
        answers_json: &str,
    ) -> AppResult<AppointmentIntake> {
        let intake_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        sqlx::query_as::<_, AppointmentIntake>(
            r#"
            INSERT INTO appointment_intakes (
                intake_id, client_user_id, psychologist_user_id, answers_json, created_at
            ) VALUES (?, ?, ?, ?, ?)
            RETURNING intake_id, client_user_id, psychologist_user_id, answers_json, created_at
            "#,
        )
        .bind(intake_id)
        .bind(client_user_id)
        .bind(psychologist_user_id)
        .bind(answers_json)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn find_intake(
        pool: &SqlitePool,
        intake_id: &str,
    ) -> AppResult<Option<AppointmentIntake>> {
        sqlx::query_as::<_, AppointmentIntake>(
            r#"
            SELECT intake_id, client_user_id, psychologist_user_id, answers_json, created_at
            FROM appointment_intakes
            WHERE intake_id = ?
            "#,
        )
        .bind(intake_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)
    }

    // ========================================================================
    // Appointments
    // ========================================================================

    pub async fn create(
        pool: &SqlitePool,
        appointment: CreateAppointment,
    ) -> AppResult<AppointmentDetails> {
        let appointment_id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO appointments (
                appointment_id, client_user_id, psychologist_user_id, intake_id,
                start_at, status, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 'requested', NULL, ?, NULL)
            "#,
        )
        .bind(&appointment_id)
        .bind(appointment.client_user_id)
        .bind(appointment.psychologist_user_id)
        .bind(appointment.intake_id)
        .bind(appointment.start_at)
        .bind(now)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;

        Self::find(pool, &appointment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Appointment not found".to_string()))
    }

    pub async fn find(
        pool: &SqlitePool,
        appointment_id: &str,
    ) -> AppResult<Option<AppointmentDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE a.appointment_id = ?");
        sqlx::query_as::<_, AppointmentDetails>(&sql)
            .bind(appointment_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)
    }

    pub async fn list_for_client(
        pool: &SqlitePool,
        client_user_id: &str,
    ) -> AppResult<Vec<AppointmentDetails>> {
        let sql = format!("{DETAILS_SELECT} WHERE a.client_user_id = ? ORDER BY a.created_at DESC");
        sqlx::query_as::<_, AppointmentDetails>(&sql)
            .bind(client_user_id)
            .fetch_all(pool)
            .await
            .map_err(AppError::Database)
    }

    /// Requests addressed to a psychologist, newest first, optionally
    /// narrowed to one status.
    pub async fn list_for_psychologist(
        pool: &SqlitePool,
        psychologist_user_id: &str,
        status: Option<&str>,
    ) -> AppResult<Vec<AppointmentDetails>> {
        let sql = match status {
            Some(_) => format!(
                "{DETAILS_SELECT} WHERE a.psychologist_user_id = ? AND a.status = ? ORDER BY a.created_at DESC"
            ),
            None => format!(
                "{DETAILS_SELECT} WHERE a.psychologist_user_id = ? ORDER BY a.created_at DESC"
            ),
        };

        let mut query = sqlx::query_as::<_, AppointmentDetails>(&sql).bind(psychologist_user_id);
        if let Some(status) = status {
            query = query.bind(status);
        }
        query.fetch_all(pool).await.map_err(AppError::Database)
    }

    /// Set status and notes. Only matches appointments owned by the
    /// psychologist; returns whether a row changed.
    pub async fn update_status(
        pool: &SqlitePool,
        appointment_id: &str,
        psychologist_user_id: &str,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> AppResult<bool> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            r#"
            UPDATE appointments
            SET status = ?, notes = ?, updated_at = ?
            WHERE appointment_id = ? AND psychologist_user_id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(notes)
        .bind(now)
        .bind(appointment_id)
        .bind(psychologist_user_id)
        .execute(pool)
        .await
        .map_err(AppError::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Psychologist dashboards
    // ========================================================================

    pub async fn list_sessions(
        pool: &SqlitePool,
        psychologist_user_id: &str,
    ) -> AppResult<Vec<PsychologistSession>> {
        sqlx::query_as::<_, PsychologistSession>(
            r#"
            SELECT
                a.appointment_id, a.client_user_id,
                u.username AS client_username, u.email AS client_email,
                u.age AS client_age, u.gender AS client_gender,
                a.intake_id, i.answers_json AS intake_answers_json,
                a.start_at, a.status, a.notes, a.created_at, a.updated_at
            FROM appointments a
            JOIN users u ON u.id = a.client_user_id
            LEFT JOIN appointment_intakes i ON i.intake_id = a.intake_id
            WHERE a.psychologist_user_id = ?
            ORDER BY a.start_at DESC
            "#,
        )
        .bind(psychologist_user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn list_clients(
        pool: &SqlitePool,
        psychologist_user_id: &str,
    ) -> AppResult<Vec<ClientSummary>> {
        sqlx::query_as::<_, ClientSummary>(
            r#"
            SELECT
                u.id AS user_id, u.username, u.email, u.age, u.gender,
                COUNT(a.appointment_id) AS appointments_count,
                MAX(a.start_at) AS last_appointment_at
            FROM appointments a
            JOIN users u ON u.id = a.client_user_id
            WHERE a.psychologist_user_id = ?
            GROUP BY u.id, u.username, u.email, u.age, u.gender
            ORDER BY u.username ASC
            "#,
        )
        .bind(psychologist_user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}
