use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Requested,
    Approved,
    Rejected,
    Canceled,
    Completed,
}

impl AppointmentStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "requested" => Some(AppointmentStatus::Requested),
            "approved" => Some(AppointmentStatus::Approved),
            "rejected" => Some(AppointmentStatus::Rejected),
            "canceled" => Some(AppointmentStatus::Canceled),
            "completed" => Some(AppointmentStatus::Completed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Requested => "requested",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rejected => "rejected",
            AppointmentStatus::Canceled => "canceled",
            AppointmentStatus::Completed => "completed",
        }
    }

    /// Statuses a psychologist may move an appointment into.
    pub fn is_settable_by_psychologist(self) -> bool {
        !matches!(self, AppointmentStatus::Requested)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AppointmentIntake {
    pub intake_id: String,
    pub client_user_id: String,
    pub psychologist_user_id: String,
    pub answers_json: String,
    pub created_at: NaiveDateTime,
}

/// Appointment joined with the requesting client's public fields.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AppointmentDetails {
    pub appointment_id: String,
    pub client_user_id: String,
    pub client_username: Option<String>,
    pub client_email: Option<String>,
    pub psychologist_user_id: String,
    pub intake_id: Option<String>,
    pub start_at: NaiveDateTime,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub client_user_id: String,
    pub psychologist_user_id: String,
    pub intake_id: Option<String>,
    pub start_at: NaiveDateTime,
}

/// Psychologist session list row: appointment + client + intake answers.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PsychologistSession {
    pub appointment_id: String,
    pub client_user_id: String,
    pub client_username: Option<String>,
    pub client_email: Option<String>,
    pub client_age: Option<i32>,
    pub client_gender: Option<i32>,
    pub intake_id: Option<String>,
    pub intake_answers_json: Option<String>,
    pub start_at: NaiveDateTime,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ClientSummary {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub age: Option<i32>,
    pub gender: Option<i32>,
    pub appointments_count: i64,
    pub last_appointment_at: Option<NaiveDateTime>,
}
