use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::*;
use crate::error::{AppError, AppResult};

pub struct MoodEntryRepository;

impl MoodEntryRepository {
    pub async fn create(pool: &SqlitePool, entry: NewMoodEntry) -> AppResult<MoodEntry> {
        let id = Uuid::new_v4().to_string();
        sqlx::query_as::<_, MoodEntry>(
            r#"
            INSERT INTO mood_entries (id, user_id, score, label, note, emojis_json, source, captured_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, user_id, score, label, note, emojis_json, source, captured_at
            "#,
        )
        .bind(id)
        .bind(entry.user_id)
        .bind(entry.score)
        .bind(entry.label)
        .bind(entry.note)
        .bind(entry.emojis_json)
        .bind(entry.source.as_str())
        .bind(entry.captured_at)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Distinct UTC calendar days with at least one entry, newest first.
    /// Rows whose timestamp prefix does not parse as a date are skipped.
    pub async fn entry_days(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<NaiveDate>> {
        let days: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT substr(captured_at, 1, 10) AS day
            FROM mood_entries
            WHERE user_id = ?
            ORDER BY day DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(days
            .iter()
            .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .collect())
    }

    pub async fn samples_since(
        pool: &SqlitePool,
        user_id: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<MoodSample>> {
        sqlx::query_as::<_, MoodSample>(
            r#"
            SELECT score, captured_at
            FROM mood_entries
            WHERE user_id = ? AND captured_at >= ?
            ORDER BY captured_at ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    /// Per-day averages for entries captured at or after `since`, oldest day first.
    pub async fn daily_averages(
        pool: &SqlitePool,
        user_id: &str,
        since: NaiveDateTime,
    ) -> AppResult<Vec<DailyMood>> {
        sqlx::query_as::<_, DailyMood>(
            r#"
            SELECT substr(captured_at, 1, 10) AS day,
                   AVG(score) AS avg_score,
                   COUNT(*) AS entries_count
            FROM mood_entries
            WHERE user_id = ? AND captured_at >= ?
            GROUP BY day
            ORDER BY day ASC
            "#,
        )
        .bind(user_id)
        .bind(since)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn top_labels(
        pool: &SqlitePool,
        user_id: &str,
        since: NaiveDateTime,
        limit: i64,
    ) -> AppResult<Vec<LabelCount>> {
        sqlx::query_as::<_, LabelCount>(
            r#"
            SELECT label, COUNT(*) AS count
            FROM mood_entries
            WHERE user_id = ? AND captured_at >= ? AND label IS NOT NULL AND label != ''
            GROUP BY label
            ORDER BY count DESC, label ASC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::repository::user::tests::seed_user;
    use crate::db::testing::test_pool;
    use chrono::{Duration, Utc};

    pub(crate) async fn seed_entry(
        pool: &SqlitePool,
        user_id: &str,
        score: i32,
        label: Option<&str>,
        captured_at: NaiveDateTime,
    ) -> MoodEntry {
        MoodEntryRepository::create(
            pool,
            NewMoodEntry {
                user_id: user_id.to_string(),
                score,
                label: label.map(str::to_string),
                note: None,
                emojis_json: None,
                source: MoodSource::Checkin,
                captured_at,
            },
        )
        .await
        .expect("mood entry")
    }

    #[tokio::test]
    async fn days_and_daily_averages_bucket_by_date() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice", UserRole::Regular).await;
        let now = Utc::now().naive_utc();
        let yesterday = now - Duration::days(1);

        seed_entry(&pool, &user.id, 4, Some("tired"), yesterday).await;
        seed_entry(&pool, &user.id, 8, Some("happy"), now).await;
        seed_entry(&pool, &user.id, 6, Some("happy"), now).await;

        let days = MoodEntryRepository::entry_days(&pool, &user.id).await.unwrap();
        assert_eq!(days, vec![now.date(), yesterday.date()]);

        let daily = MoodEntryRepository::daily_averages(&pool, &user.id, now - Duration::days(7))
            .await
            .unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[1].entries_count, 2);
        assert!((daily[1].avg_score - 7.0).abs() < f64::EPSILON);

        let labels = MoodEntryRepository::top_labels(&pool, &user.id, now - Duration::days(14), 5)
            .await
            .unwrap();
        assert_eq!(labels[0].label, "happy");
        assert_eq!(labels[0].count, 2);
    }

    #[tokio::test]
    async fn score_out_of_range_is_rejected_by_schema() {
        let pool = test_pool().await;
        let user = seed_user(&pool, "alice", UserRole::Regular).await;
        let result = MoodEntryRepository::create(
            &pool,
            NewMoodEntry {
                user_id: user.id,
                score: 11,
                label: None,
                note: None,
                emojis_json: None,
                source: MoodSource::Chat,
                captured_at: Utc::now().naive_utc(),
            },
        )
        .await;
        assert!(result.is_err());
    }
}
