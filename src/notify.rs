use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Outbound message channel to a parent's contact (SMS gateway or similar).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError>;
}

/// Writes the message to the log instead of delivering it.
#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        info!(target: "notify", "SMS to {contact}: {message}");
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    message: &'a str,
}

/// POSTs `{"to": ..., "message": ...}` to a gateway URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), url: url.into() }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, contact: &str, message: &str) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(&WebhookPayload { to: contact, message })
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(NotifyError::Delivery(format!("gateway answered {}", resp.status())));
        }
        Ok(())
    }
}

pub fn build_notifier(cfg: &AppConfig) -> Arc<dyn Notifier> {
    match &cfg.notify_webhook_url {
        Some(url) => {
            info!("Notifications delivered via webhook {url}");
            Arc::new(WebhookNotifier::new(url.clone()))
        }
        None => {
            info!("No NOTIFY_WEBHOOK_URL set; notifications are logged only");
            Arc::new(LogNotifier)
        }
    }
}

/// Text sent to a parent when a submission is rejected.
pub fn rejection_message(child_name: &str, feedback: Option<&str>) -> String {
    match feedback {
        Some(f) => format!("Milestone submission for {child_name} has been rejected. Feedback: {f}"),
        None => format!("Milestone submission for {child_name} has been rejected. Please review and resubmit."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_message_with_and_without_feedback() {
        assert_eq!(
            rejection_message("Mia", Some("retry")),
            "Milestone submission for Mia has been rejected. Feedback: retry"
        );
        assert!(rejection_message("Mia", None).ends_with("Please review and resubmit."));
    }

    #[actix_web::test]
    async fn log_notifier_never_fails() {
        assert!(LogNotifier.notify("555-0101", "hello").await.is_ok());
    }
}
