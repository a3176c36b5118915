//! Generic HTTP webhook notifier.
//!
//! Without a body template the [`Notification`] itself is posted as JSON.
//! A minijinja body template lets the receiver keep its own schema.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;

use crate::env_refs;
use crate::templating::TemplateRenderer;
use crate::traits::{Notification, Notifier, NotifyError};

/// Longest receiver error body kept in a [`NotifyError::Rejected`].
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug)]
pub struct WebhookNotifier {
    /// Target URL with `${VAR}` references expanded.
    url: String,
    method: Method,
    /// Sorted by name so requests are reproducible.
    headers: Vec<(String, String)>,
    body_template: Option<String>,
    renderer: Arc<TemplateRenderer>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Build from a rule target.
    ///
    /// `${VAR}` references in the URL and header values are expanded now, so a
    /// missing variable fails registration instead of the first delivery.
    /// `method` defaults to `POST` and is case-insensitive.
    pub fn from_config(
        url: String,
        method: Option<String>,
        headers: Option<HashMap<String, String>>,
        body_template: Option<String>,
        renderer: Arc<TemplateRenderer>,
    ) -> Result<Self, NotifyError> {
        let url = env_refs::expand(&url)?;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(NotifyError::Config(format!("webhook url must be http(s), got '{url}'")));
        }

        let mut resolved = Vec::new();
        for (name, value) in headers.unwrap_or_default() {
            resolved.push((name, env_refs::expand(&value)?));
        }
        resolved.sort();

        if let Some(template) = &body_template {
            renderer
                .validate(template)
                .map_err(|e| NotifyError::Config(format!("invalid body template: {e}")))?;
        }

        Ok(Self {
            url,
            method: parse_method(method.as_deref())?,
            headers: resolved,
            body_template,
            renderer,
            client: reqwest::Client::new(),
        })
    }

    fn body(&self, notification: &Notification) -> Result<String, NotifyError> {
        match &self.body_template {
            Some(template) => self.renderer.render(template, notification),
            None => serde_json::to_string(notification)
                .map_err(|e| NotifyError::Config(format!("cannot encode notification: {e}"))),
        }
    }

    fn request(&self, notification: &Notification) -> Result<reqwest::RequestBuilder, NotifyError> {
        let mut request = self
            .client
            .request(self.method.clone(), &self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(self.body(notification)?);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        Ok(request)
    }
}

fn parse_method(raw: Option<&str>) -> Result<Method, NotifyError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Method::POST),
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| NotifyError::Config(format!("invalid HTTP method: {m}"))),
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self.request(notification)?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            tracing::warn!(url = %self.url, %status, "webhook rejected notification");
            return Err(NotifyError::Rejected {
                code: status.as_u16().to_string(),
                message: text,
            });
        }

        tracing::debug!(url = %self.url, method = %self.method, rule_id = %notification.rule_id, "webhook delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}
