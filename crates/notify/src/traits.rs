//! Notifier trait definition and shared error types.

use serde::{Deserialize, Serialize};

use spot_core::Classification;

/// Errors that can occur during notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Delivery timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Channel rejected message ({code}): {message}")]
    Rejected { code: String, message: String },
}

/// Body syntax of a rendered notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    #[default]
    Markdown,
    Text,
}

/// A rendered notification ready for delivery.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    /// The rendered subject/title.
    pub subject: String,
    /// The rendered body content.
    pub body: String,
    pub format: MessageFormat,
    /// Rule id, or the request id of an ad-hoc query.
    pub rule_id: String,
    /// `None` only for connectivity probes.
    pub classification: Option<Classification>,
    /// Offerings in the batch.
    pub count: usize,
}

impl Notification {
    /// Plain-text connectivity probe.
    pub fn probe(rule_id: &str) -> Self {
        Self {
            subject: "[TEST] Spot price alarm".to_string(),
            body: "Connectivity check, no prices attached.".to_string(),
            format: MessageFormat::Text,
            rule_id: rule_id.to_string(),
            classification: None,
            count: 0,
        }
    }
}

/// Trait for notification channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification through this channel.
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "dingtalk", "webhook").
    fn channel_name(&self) -> &str;
}

/// Result of dispatching a notification to a single channel.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchResult {
    pub channel: String,
    pub rule_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}
