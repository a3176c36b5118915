//! Fan-out of one notification to a rule's channels.
//!
//! Channels are tried in order, each under its own deadline. A failing
//! channel never blocks the others, and nothing is retried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::traits::{DispatchResult, Notification, Notifier, NotifyError};

/// The delivery channels of one rule (or one ad-hoc request).
#[derive(Default)]
pub struct Dispatcher {
    channels: Vec<Arc<dyn Notifier>>,
    /// Per-channel delivery deadline.
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self {
            channels,
            timeout: None,
        }
    }

    /// Bound every channel send by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    async fn send_one(&self, channel: &dyn Notifier, notification: &Notification) -> Result<(), NotifyError> {
        let Some(limit) = self.timeout else {
            return channel.send(notification).await;
        };
        tokio::time::timeout(limit, channel.send(notification))
            .await
            .unwrap_or(Err(NotifyError::Timeout(limit)))
    }

    /// Deliver `notification` on every channel and report each attempt.
    pub async fn dispatch(&self, rule_id: &str, notification: &Notification) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::warn!(rule_id, "no notification channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let started = Instant::now();
            let outcome = self.send_one(channel.as_ref(), notification).await;
            let duration_ms = started.elapsed().as_millis() as u64;
            let name = channel.channel_name();

            let error = match outcome {
                Ok(()) => {
                    tracing::info!(rule_id, channel = name, duration_ms, "notification delivered");
                    None
                }
                Err(e) => {
                    tracing::warn!(rule_id, channel = name, error = %e, duration_ms, "notification delivery failed");
                    Some(e.to_string())
                }
            };
            results.push(DispatchResult {
                channel: name.to_string(),
                rule_id: rule_id.to_string(),
                success: error.is_none(),
                error,
                duration_ms,
            });
        }
        results
    }

    /// Send a connectivity probe through every channel.
    pub async fn probe(&self, rule_id: &str) -> Vec<DispatchResult> {
        self.dispatch(rule_id, &Notification::probe(rule_id)).await
    }
}
