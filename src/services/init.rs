//! Initialization helpers for the application:
//! - database pool, schema migrations and the startup connectivity probe
//! - background worker spawn helpers

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::config::Config;
use crate::services::notifications;

/// Redact potentially sensitive information from a database URL before logging.
///
/// URLs with a host are rebuilt without userinfo. Anything else carrying an
/// '@' is cut down to what follows the last '@', since a scheme-less
/// `user:pw@host` string parses with `user` as its scheme.
pub fn redact_db_url(db_url: &str) -> String {
    if let Ok(url) = url::Url::parse(db_url) {
        if let Some(host) = url.host_str() {
            let port_part = url.port().map(|p| format!(":{}", p)).unwrap_or_default();
            return format!("{}://{}{}{}", url.scheme(), host, port_part, url.path());
        }
        if !db_url.contains('@') {
            return db_url.to_string();
        }
    }

    match db_url.rfind('@') {
        Some(at_pos) => format!("(redacted){}", &db_url[at_pos + 1..]),
        None => "(redacted)".to_string(),
    }
}

/// Build the SQLite pool without touching the database.
///
/// Creates the parent directory for the database file (if applicable). The
/// first connection is opened on first use, so a broken database never stops
/// the process from starting.
pub fn connect_db(config: &Config) -> Result<SqlitePool> {
    let db_url = &config.database.url;
    tracing::info!("Using database: {}", redact_db_url(db_url));

    let db_path = db_url.strip_prefix("sqlite://").unwrap_or(db_url);
    let db_file_path = Path::new(db_path);

    if let Some(parent) = db_file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                )
            })?;
        }
    }

    let connect_options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true);

    Ok(SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_lazy_with(connect_options))
}

/// Run the embedded migrations. Failures are logged and the service keeps
/// running in degraded mode.
pub async fn init_schema(pool: &SqlitePool) -> bool {
    tracing::info!("Running database migrations");
    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            tracing::info!("Database schema ready");
            true
        }
        Err(e) => {
            tracing::error!("Database schema initialization failed: {}", e);
            false
        }
    }
}

/// Quick `SELECT 1` probe with a timeout. The result is only logged.
pub async fn ping_db(pool: &SqlitePool, timeout_seconds: f64) {
    if timeout_seconds <= 0.0 {
        tracing::debug!("Database ping disabled");
        return;
    }

    let probe = sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool);
    match tokio::time::timeout(Duration::from_secs_f64(timeout_seconds), probe).await {
        Ok(Ok(_)) => tracing::info!("Database ping ok"),
        Ok(Err(e)) => tracing::warn!("Database ping failed: {}", e),
        Err(_) => tracing::warn!("Database ping timed out after {}s", timeout_seconds),
    }
}

/// Open the pool, prepare the schema and probe the database.
pub async fn init_db(config: &Config) -> Result<SqlitePool> {
    let pool = connect_db(config)?;

    if config.database.init_on_startup {
        init_schema(&pool).await;
    } else {
        tracing::info!("Schema initialization on startup disabled");
    }

    ping_db(&pool, config.database.ping_timeout_seconds).await;
    Ok(pool)
}

/// One worker pass: plan reminders, then deliver due jobs. Errors are logged.
pub async fn run_notification_cycle(state: &crate::AppState) {
    let now = Utc::now().naive_utc();

    match notifications::plan_notifications(&state.db, now).await {
        Ok(0) => {}
        Ok(planned) => tracing::info!("Planned {} notification(s)", planned),
        Err(e) => tracing::warn!("Notification planning failed: {:?}", e),
    }

    let Some(push) = state.push.as_deref() else {
        tracing::debug!("Push delivery disabled; queued jobs stay pending");
        return;
    };

    match notifications::process_due_jobs(&state.db, push, state.config.worker.batch_size, now)
        .await
    {
        Ok(report) if report.sent + report.failed + report.skipped > 0 => tracing::info!(
            "Notification cycle done: sent={}, failed={}, skipped={}",
            report.sent,
            report.failed,
            report.skipped
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!("Notification delivery cycle failed: {:?}", e),
    }
}

/// Spawn background workers:
/// - the notification worker (reminder planner + push delivery)
///
/// These are spawned as `tokio::spawn` tasks. The function returns a vector of
/// `JoinHandle<()>`s so callers can await task shutdown. Each worker listens
/// for a shutdown notification via a `tokio::sync::broadcast::Sender<()>`.
pub fn spawn_background_workers(
    state: Arc<crate::AppState>,
    shutdown: tokio::sync::broadcast::Sender<()>,
) -> Vec<tokio::task::JoinHandle<()>> {
    let mut handles = Vec::new();

    if !state.config.worker.enabled {
        tracing::info!("Notification worker disabled by configuration");
        return handles;
    }

    {
        let mut shutdown_rx = shutdown.subscribe();
        let state = state.clone();
        let interval = Duration::from_secs(state.config.worker.interval_seconds);
        handles.push(tokio::spawn(async move {
            tracing::info!(
                "Notification worker started (interval={}s, batch={})",
                interval.as_secs(),
                state.config.worker.batch_size
            );
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    tracing::info!("Notification worker received shutdown signal");
                    break;
                }

                run_notification_cycle(&state).await;

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Notification worker shutting down");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }));
    }

    handles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_credentials() {
        assert_eq!(
            redact_db_url("postgres://user:pw@db.local:5432/app"),
            "postgres://db.local:5432/app"
        );
        assert_eq!(redact_db_url("user:pw@somewhere"), "(redacted)somewhere");
        assert_eq!(redact_db_url("sqlite:data/mendly.db"), "sqlite:data/mendly.db");
        assert_eq!(redact_db_url("sqlite://data/mendly.db"), "sqlite://data/mendly.db");
        assert!(!redact_db_url("sqlite:u:secret@x.db").contains("secret"));
    }

    use crate::db::models::{JobStatus, UserRole};
    use crate::db::repository::device_token::tests::seed_token;
    use crate::db::repository::user::tests::seed_user;
    use crate::db::repository::NotificationQueueRepository;
    use crate::services::mailer::DisabledMailer;
    use crate::services::notifications::{QueuedNotification, WeeklySummaryPayload};
    use crate::services::push::testing::RecordingPushClient;

    async fn state_with(push: Option<Arc<dyn crate::services::push::PushClient>>) -> crate::AppState {
        crate::AppState {
            db: crate::db::testing::test_pool().await,
            config: Config::default(),
            push,
            mailer: Arc::new(DisabledMailer),
        }
    }

    #[tokio::test]
    async fn cycle_without_push_client_leaves_jobs_pending() {
        let state = state_with(None).await;
        let user = seed_user(&state.db, "alice", UserRole::Regular).await;
        seed_token(&state.db, &user.id, "fcm").await;
        let job = notifications::enqueue(
            &state.db,
            &user.id,
            &QueuedNotification::WeeklySummary(WeeklySummaryPayload::default()),
            Utc::now().naive_utc(),
        )
        .await
        .unwrap();

        run_notification_cycle(&state).await;

        let job = NotificationQueueRepository::find_by_id(&state.db, &job.job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status(), Some(JobStatus::Pending));
    }

    #[tokio::test]
    async fn cycle_survives_a_broken_database() {
        let push = Arc::new(RecordingPushClient::succeeding());
        let state = state_with(Some(push.clone() as Arc<dyn crate::services::push::PushClient>)).await;
        sqlx::query("DROP TABLE notification_queue")
            .execute(&state.db)
            .await
            .unwrap();

        run_notification_cycle(&state).await;
        state.db.close().await;
        run_notification_cycle(&state).await;
        assert!(push.sent().is_empty());
    }

    #[tokio::test]
    async fn ping_with_disabled_timeout_returns_immediately() {
        let pool = crate::db::testing::test_pool().await;
        ping_db(&pool, 0.0).await;
        ping_db(&pool, 1.0).await;
    }
}
