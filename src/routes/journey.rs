use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{InteractionPurpose, LabelCount, SlotName};
use crate::db::{
    AdherenceRepository, AiInteractionRepository, MoodEntryRepository, RecommendationRepository,
    UserSettingsRepository,
};
use crate::error::AppResult;
use crate::routes::auth::AuthUser;
use crate::routes::check_range;
use crate::services::journey::{self, SeriesPoint, SUMMARY_TITLE, SUMMARY_WINDOW_DAYS};
use crate::services::notifications::{self, QueuedNotification, WeeklySummaryPayload};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/overview", get(overview))
        .route("/series", get(series))
        .route("/summary", post(create_summary))
}

const TOP_LABEL_DAYS: i64 = 14;
const TOP_LABEL_LIMIT: i64 = 6;
const RECENT_RECOMMENDATIONS: i64 = 3;

#[derive(Debug, Deserialize)]
pub struct SeriesQuery {
    pub days: Option<i32>,
}

#[derive(Debug, Serialize)]
struct OverviewSettings {
    checkin_frequency: i32,
    motivation_enabled: bool,
}

#[derive(Debug, Serialize)]
struct DaySummary {
    date: String,
    avg_score: f64,
    entries_count: i64,
}

#[derive(Debug, Serialize)]
struct OverviewAdherence {
    streak_days: i64,
    avg_7d: Option<f64>,
    avg_14d: Option<f64>,
    avg_30d: Option<f64>,
    last_checkin_at: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
struct TodayActivity {
    checkins: i64,
    avg: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ScheduleSlot {
    slot: String,
    h: i32,
    m: i32,
}

#[derive(Debug, Serialize)]
struct RecentRecommendation {
    rec_id: String,
    rec_type: String,
    title: String,
    user_action: Option<String>,
}

#[derive(Debug, Serialize)]
struct AiSummary {
    created_at: NaiveDateTime,
    text: String,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    settings: OverviewSettings,
    last7days: Vec<DaySummary>,
    adherence: OverviewAdherence,
    today: TodayActivity,
    schedule: Vec<ScheduleSlot>,
    top_labels: Vec<LabelCount>,
    recent_recs: Vec<RecentRecommendation>,
    ai_summary: Option<AiSummary>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub created_at: NaiveDateTime,
}

async fn overview(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<OverviewResponse>> {
    let now = Utc::now().naive_utc();
    let today = now.date().format("%Y-%m-%d").to_string();

    let settings = UserSettingsRepository::get_or_create(&state.db, &user.id).await?;
    let daily =
        MoodEntryRepository::daily_averages(&state.db, &user.id, now - Duration::days(7)).await?;
    let stats = AdherenceRepository::find(&state.db, &user.id).await?;
    let slots = UserSettingsRepository::list_slots(&state.db, &user.id).await?;
    let top_labels = MoodEntryRepository::top_labels(
        &state.db,
        &user.id,
        now - Duration::days(TOP_LABEL_DAYS),
        TOP_LABEL_LIMIT,
    )
    .await?;
    let recs = RecommendationRepository::recent(&state.db, &user.id, RECENT_RECOMMENDATIONS).await?;
    let ai_summary =
        AiInteractionRepository::latest(&state.db, &user.id, InteractionPurpose::Summary).await?;

    let today_activity = daily
        .iter()
        .find(|d| d.day == today)
        .map(|d| TodayActivity {
            checkins: d.entries_count,
            avg: Some(d.avg_score),
        })
        .unwrap_or(TodayActivity {
            checkins: 0,
            avg: None,
        });

    let adherence = match stats {
        Some(s) => OverviewAdherence {
            streak_days: s.streak_days,
            avg_7d: s.avg_7d,
            avg_14d: s.avg_14d,
            avg_30d: s.avg_30d,
            last_checkin_at: s.last_checkin_at,
        },
        None => OverviewAdherence {
            streak_days: 0,
            avg_7d: None,
            avg_14d: None,
            avg_30d: None,
            last_checkin_at: None,
        },
    };

    Ok(Json(OverviewResponse {
        settings: OverviewSettings {
            checkin_frequency: settings.checkin_frequency,
            motivation_enabled: settings.motivation_enabled,
        },
        last7days: daily
            .into_iter()
            .map(|d| DaySummary {
                date: d.day,
                avg_score: d.avg_score,
                entries_count: d.entries_count,
            })
            .collect(),
        adherence,
        today: today_activity,
        schedule: slots
            .into_iter()
            .filter(|s| s.enabled && SlotName::from_str(&s.slot_name).is_some())
            .map(|s| ScheduleSlot {
                slot: s.slot_name,
                h: s.local_hour,
                m: s.local_minute,
            })
            .collect(),
        top_labels,
        recent_recs: recs
            .into_iter()
            .map(|r| RecentRecommendation {
                rec_id: r.rec_id,
                rec_type: r.rec_type,
                title: r.title,
                user_action: r.user_action,
            })
            .collect(),
        ai_summary: ai_summary.map(|a| AiSummary {
            created_at: a.created_at,
            text: a.output_text,
        }),
    }))
}

/// Per-day averages for exactly `days` days ending today.
async fn series(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Query(query): Query<SeriesQuery>,
) -> AppResult<Json<Vec<SeriesPoint>>> {
    let days = query.days.unwrap_or(7);
    check_range("days", Some(days), 1, 90)?;
    let days = days as i64;

    let today = Utc::now().date_naive();
    let since = (today - Duration::days(days - 1)).and_time(chrono::NaiveTime::MIN);
    let daily = MoodEntryRepository::daily_averages(&state.db, &user.id, since).await?;

    Ok(Json(journey::mood_series(&daily, today, days)))
}

/// Build the weekly recap, store it and queue it as a push.
async fn create_summary(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<SummaryResponse>> {
    let now = Utc::now().naive_utc();
    let since = now - Duration::days(SUMMARY_WINDOW_DAYS);

    let daily = MoodEntryRepository::daily_averages(&state.db, &user.id, since).await?;
    let stats = AdherenceRepository::find(&state.db, &user.id).await?;
    let labels = MoodEntryRepository::top_labels(&state.db, &user.id, since, 1).await?;

    let text = journey::weekly_summary(&daily, stats.as_ref(), &labels);
    let interaction = AiInteractionRepository::create(
        &state.db,
        &user.id,
        InteractionPurpose::Summary,
        "weekly_summary",
        &text,
    )
    .await?;

    let job = notifications::enqueue(
        &state.db,
        &user.id,
        &QueuedNotification::WeeklySummary(WeeklySummaryPayload {
            title: Some(SUMMARY_TITLE.to_string()),
            body: Some(text.clone()),
        }),
        now,
    )
    .await;

    if let Err(e) = job {
        tracing::warn!("Failed to queue weekly summary push for user {}: {:?}", user.id, e);
    }

    Ok(Json(SummaryResponse {
        summary: text,
        created_at: interaction.created_at,
    }))
}
