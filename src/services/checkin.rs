//! Check-in recording and adherence aggregation (streak + rolling averages).

use chrono::{Duration, NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;

use crate::db::models::*;
use crate::db::repository::{AdherenceRepository, MoodEntryRepository};
use crate::error::AppResult;
use crate::services::scoring;

/// Longest rolling window, also the lookback for loading samples.
pub const MAX_WINDOW_DAYS: i64 = 30;

/// Consecutive days with entries, walking backward from `today`.
///
/// `days` must be distinct and sorted newest first. Days after the cursor
/// (future-dated entries) are skipped; the first gap ends the streak.
pub fn compute_streak(days: &[NaiveDate], today: NaiveDate) -> i64 {
    let mut streak = 0;
    let mut cursor = today;

    for day in days {
        if *day == cursor {
            streak += 1;
            match cursor.pred_opt() {
                Some(prev) => cursor = prev,
                None => break,
            }
        } else if *day > cursor {
            continue;
        } else {
            break;
        }
    }

    streak
}

/// Mean score of samples captured within the last `days` days of `now`.
pub fn rolling_average(samples: &[MoodSample], now: NaiveDateTime, days: i64) -> Option<f64> {
    let cutoff = now - Duration::days(days);
    let (sum, count) = samples
        .iter()
        .filter(|s| s.captured_at >= cutoff)
        .fold((0i64, 0i64), |(sum, count), s| (sum + s.score as i64, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum as f64 / count as f64)
    }
}

/// Recompute and persist the user's adherence stats as of `now`.
pub async fn refresh_adherence(
    pool: &SqlitePool,
    user_id: &str,
    now: NaiveDateTime,
) -> AppResult<AdherenceStats> {
    let days = MoodEntryRepository::entry_days(pool, user_id).await?;
    let samples =
        MoodEntryRepository::samples_since(pool, user_id, now - Duration::days(MAX_WINDOW_DAYS))
            .await?;

    let stats = AdherenceStats {
        user_id: user_id.to_string(),
        streak_days: compute_streak(&days, now.date()),
        last_checkin_at: Some(now),
        avg_7d: rolling_average(&samples, now, 7),
        avg_14d: rolling_average(&samples, now, 14),
        avg_30d: rolling_average(&samples, now, 30),
        updated_at: now,
    };

    tracing::debug!(
        user_id,
        streak = stats.streak_days,
        "Adherence stats refreshed"
    );

    AdherenceRepository::upsert(pool, &stats).await
}

/// A check-in as submitted by the client.
#[derive(Debug, Clone, Default)]
pub struct CheckinInput {
    pub score: Option<i32>,
    pub label: Option<String>,
    pub note: Option<String>,
}

/// Score and store a check-in, then refresh adherence.
pub async fn record_checkin(
    pool: &SqlitePool,
    user_id: &str,
    input: CheckinInput,
    now: NaiveDateTime,
) -> AppResult<(MoodEntry, AdherenceStats)> {
    let score = scoring::score_checkin(input.score, input.label.as_deref(), input.note.as_deref());
    let emojis_json = scoring::emoji_for_score(score)
        .map(|emoji| serde_json::json!({ "selected": emoji, "score": score }).to_string());

    let entry = MoodEntryRepository::create(
        pool,
        NewMoodEntry {
            user_id: user_id.to_string(),
            score,
            label: input.label.filter(|l| !l.is_empty()),
            note: input.note.filter(|n| !n.is_empty()).map(String::into_bytes),
            emojis_json,
            source: MoodSource::Checkin,
            captured_at: now,
        },
    )
    .await?;

    let stats = refresh_adherence(pool, user_id, now).await?;
    Ok((entry, stats))
}
