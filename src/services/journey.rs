//! Journey views: the per-day mood series and the rule-based weekly summary.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::db::models::{AdherenceStats, DailyMood, LabelCount};
use crate::services::scoring;

pub const SUMMARY_WINDOW_DAYS: i64 = 7;
pub const SUMMARY_TITLE: &str = "Your weekly Mendly summary";

/// Trend threshold, in score points, between the first and last day of the window.
const TREND_DELTA: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: String,
    pub avg_score: Option<f64>,
}

/// Exactly `days` points ending at `today`, oldest first. Days without
/// entries carry `None`.
pub fn mood_series(daily: &[DailyMood], today: NaiveDate, days: i64) -> Vec<SeriesPoint> {
    (0..days)
        .rev()
        .map(|offset| {
            let date = (today - Duration::days(offset)).format("%Y-%m-%d").to_string();
            let avg_score = daily.iter().find(|d| d.day == date).map(|d| d.avg_score);
            SeriesPoint { date, avg_score }
        })
        .collect()
}

fn plural(n: i64, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

/// Plain-text recap of the last week of check-ins.
pub fn weekly_summary(
    daily: &[DailyMood],
    stats: Option<&AdherenceStats>,
    labels: &[LabelCount],
) -> String {
    let entries: i64 = daily.iter().map(|d| d.entries_count).sum();
    if entries == 0 {
        return "No check-ins in the last 7 days yet. A quick check-in today is a great place to start."
            .to_string();
    }

    let weighted: f64 = daily
        .iter()
        .map(|d| d.avg_score * d.entries_count as f64)
        .sum();
    let average = weighted / entries as f64;

    let mut parts = vec![format!(
        "This week you checked in {} across {}.",
        plural(entries, "time"),
        plural(daily.len() as i64, "day")
    )];
    parts.push(format!(
        "Average mood: {:.1}/10 ({}).",
        average,
        scoring::mood_label(average.round() as i32)
    ));

    if let (Some(first), Some(last)) = (daily.first(), daily.last()) {
        if daily.len() > 1 {
            let delta = last.avg_score - first.avg_score;
            let trend = if delta >= TREND_DELTA {
                "Your mood trended upward. Keep doing what helps."
            } else if delta <= -TREND_DELTA {
                "Your mood dipped toward the end of the week. Be gentle with yourself."
            } else {
                "Your mood stayed fairly steady."
            };
            parts.push(trend.to_string());
        }
    }

    if let Some(top) = labels.first() {
        parts.push(format!("Most frequent feeling: {}.", top.label));
    }

    if let Some(stats) = stats.filter(|s| s.streak_days > 0) {
        parts.push(format!("Current streak: {}.", plural(stats.streak_days, "day")));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn daily(day: &str, avg: f64, count: i64) -> DailyMood {
        DailyMood {
            day: day.to_string(),
            avg_score: avg,
            entries_count: count,
        }
    }

    #[test]
    fn series_has_exact_length_and_gaps() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let points = mood_series(&[daily("2025-03-09", 6.5, 2)], today, 3);
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].date, "2025-03-08");
        assert_eq!(points[0].avg_score, None);
        assert_eq!(points[1].avg_score, Some(6.5));
        assert_eq!(points[2].date, "2025-03-10");
    }

    #[test]
    fn empty_week_gets_encouragement() {
        assert!(weekly_summary(&[], None, &[]).starts_with("No check-ins"));
    }

    #[test]
    fn summary_reports_average_trend_and_label() {
        let days = [daily("2025-03-08", 4.0, 1), daily("2025-03-10", 8.0, 3)];
        let labels = [LabelCount {
            label: "calm".into(),
            count: 3,
        }];
        let text = weekly_summary(&days, None, &labels);
        assert!(text.contains("4 times across 2 days"));
        assert!(text.contains("Average mood: 7.0/10 (Positive)"));
        assert!(text.contains("trended upward"));
        assert!(text.contains("Most frequent feeling: calm."));
    }
}
