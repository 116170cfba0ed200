//! Outbound email behind a trait. `HttpMailer` posts to a transactional
//! mail API; `DisabledMailer` logs and skips when none is configured.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::error::{AppError, AppResult};

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, text: &str) -> AppResult<()>;
}

/// Send and log any failure. Mail problems never fail the caller.
pub async fn send_best_effort(mailer: &dyn Mailer, to: &str, subject: &str, text: &str) {
    if let Err(e) = mailer.send(to, subject, text).await {
        tracing::warn!("Failed to send email to {}: {}", to, e);
    }
}

pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, to: &str, subject: &str, _text: &str) -> AppResult<()> {
        tracing::info!(
            "Mail API credentials missing; skipping email '{}' to {}",
            subject,
            to
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

pub struct HttpMailer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, subject: &str, text: &str) -> AppResult<()> {
        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&MailRequest {
                from: &self.from,
                to,
                subject,
                text,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Mail(format!("mail API responded {}: {}", status, body)));
        }

        tracing::info!("Email '{}' sent to {}", subject, to);
        Ok(())
    }
}

/// `HttpMailer` when URL, key and sender are all configured, otherwise the
/// disabled mailer.
pub fn init_mailer(config: &Config) -> Arc<dyn Mailer> {
    match (
        config.mail.api_url.clone(),
        config.mail.api_key.clone(),
        config.mail.from.clone(),
    ) {
        (Some(url), Some(key), Some(from)) => {
            tracing::info!("Mail delivery enabled via {}", url);
            Arc::new(HttpMailer::new(url, key, from))
        }
        _ => {
            tracing::warn!("MAIL_API_URL/MAIL_API_KEY/MAIL_FROM not fully set; emails are skipped");
            Arc::new(DisabledMailer)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _to: &str, _subject: &str, _text: &str) -> AppResult<()> {
            Err(AppError::Mail("down".into()))
        }
    }

    #[tokio::test]
    async fn disabled_mailer_skips_without_error() {
        assert_ok!(DisabledMailer.send("a@example.com", "s", "t").await);
    }

    #[tokio::test]
    async fn best_effort_swallows_failures() {
        send_best_effort(&FailingMailer, "a@example.com", "s", "t").await;
    }
}
