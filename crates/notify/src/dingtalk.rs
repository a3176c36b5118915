//! DingTalk custom robot notifier.
//!
//! Posts markdown or text messages to a group robot webhook. When the robot
//! has a signing secret, every request URL carries `timestamp` and an
//! HMAC-SHA256 `sign`.

use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use spot_core::config::DingTalkConfig;

use crate::traits::{MessageFormat, Notification, Notifier, NotifyError};
use crate::env_refs;

type HmacSha256 = Hmac<Sha256>;

const ROBOT_SEND_URL: &str = "https://oapi.dingtalk.com/robot/send";

#[derive(Debug, Deserialize)]
struct RobotResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Delivers notifications to one DingTalk robot.
#[derive(Debug)]
pub struct DingTalkNotifier {
    /// Send URL including `access_token`.
    webhook_url: String,
    secret: Option<String>,
    client: reqwest::Client,
}

impl DingTalkNotifier {
    pub fn new(access_token: &str, secret: Option<String>) -> Self {
        Self {
            webhook_url: format!(
                "{}?access_token={}",
                ROBOT_SEND_URL,
                urlencoding::encode(access_token)
            ),
            secret,
            client: reqwest::Client::new(),
        }
    }

    /// Point at a different send URL (must already carry the token).
    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = url.into();
        self
    }

    /// Resolve a robot from either an inline token or a conversation title.
    ///
    /// An inline token may reference `${ENV_VAR}`s. Without one, the
    /// conversation title is looked up in the configured token map. The
    /// inline secret wins over the configured one.
    pub fn resolve(
        config: &DingTalkConfig,
        conversation: Option<&str>,
        token: Option<&str>,
        secret: Option<&str>,
    ) -> Result<Self, NotifyError> {
        let token = match (token, conversation) {
            (Some(t), _) => env_refs::expand(t)?,
            (None, Some(c)) => config
                .token_for(c)
                .map(str::to_string)
                .ok_or_else(|| NotifyError::Config(format!("no DingTalk token for conversation '{c}'")))?,
            (None, None) => {
                return Err(NotifyError::Config(
                    "dingtalk target needs a token or a conversation".to_string(),
                ))
            }
        };
        if token.is_empty() {
            return Err(NotifyError::Config("empty DingTalk token".to_string()));
        }

        let secret = match secret {
            Some(s) => Some(env_refs::expand(s)?),
            None => config.secret.clone(),
        };
        Ok(Self::new(&token, secret))
    }

    /// Append `timestamp` and `sign` when a secret is configured.
    fn signed_url(&self, timestamp_ms: i64) -> Result<String, NotifyError> {
        let Some(secret) = &self.secret else {
            return Ok(self.webhook_url.clone());
        };
        let string_to_sign = format!("{}\n{}", timestamp_ms, secret);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| NotifyError::Config(format!("invalid DingTalk secret: {e}")))?;
        mac.update(string_to_sign.as_bytes());
        let sign = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
        Ok(format!(
            "{}&timestamp={}&sign={}",
            self.webhook_url,
            timestamp_ms,
            urlencoding::encode(&sign)
        ))
    }
}

/// Robot message body for a notification.
pub(crate) fn robot_payload(notification: &Notification) -> serde_json::Value {
    match notification.format {
        MessageFormat::Markdown => serde_json::json!({
            "msgtype": "markdown",
            "markdown": {
                "title": notification.subject,
                "text": notification.body,
            },
        }),
        MessageFormat::Text => serde_json::json!({
            "msgtype": "text",
            "text": {
                "content": format!("{}\n{}", notification.subject, notification.body),
            },
        }),
    }
}

#[async_trait::async_trait]
impl Notifier for DingTalkNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let url = self.signed_url(chrono::Utc::now().timestamp_millis())?;
        let response = self
            .client
            .post(&url)
            .json(&robot_payload(notification))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(NotifyError::Rejected {
                code: status.to_string(),
                message: body_text,
            });
        }

        let body: RobotResponse = response.json().await?;
        if body.errcode != 0 {
            tracing::warn!(errcode = body.errcode, errmsg = %body.errmsg, "DingTalk robot rejected message");
            return Err(NotifyError::Rejected {
                code: body.errcode.to_string(),
                message: body.errmsg,
            });
        }

        tracing::debug!(subject = %notification.subject, "DingTalk message delivered");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "dingtalk"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config() -> DingTalkConfig {
        DingTalkConfig {
            tokens: HashMap::from([("ops".to_string(), "tok-ops".to_string())]),
            secret: None,
        }
    }

    #[test]
    fn resolves_conversation_token() {
        let n = DingTalkNotifier::resolve(&config(), Some("ops"), None, None).unwrap();
        assert!(n.webhook_url.ends_with("?access_token=tok-ops"));
        assert!(n.secret.is_none());
    }

    #[test]
    fn inline_token_wins() {
        let n = DingTalkNotifier::resolve(&config(), Some("ops"), Some("inline"), Some("s3")).unwrap();
        assert!(n.webhook_url.ends_with("access_token=inline"));
        assert_eq!(n.secret.as_deref(), Some("s3"));
    }

    #[test]
    fn unknown_conversation_is_config_error() {
        let err = DingTalkNotifier::resolve(&config(), Some("nobody"), None, None).unwrap_err();
        match err {
            NotifyError::Config(msg) => assert!(msg.contains("nobody")),
            other => panic!("expected Config error, got: {other:?}"),
        }
        assert!(DingTalkNotifier::resolve(&config(), None, None, None).is_err());
    }

    #[test]
    fn unsigned_url_is_unchanged() {
        let n = DingTalkNotifier::new("abc", None);
        assert_eq!(
            n.signed_url(1_700_000_000_000).unwrap(),
            "https://oapi.dingtalk.com/robot/send?access_token=abc"
        );
    }

    #[test]
    fn signed_url_carries_timestamp_and_sign() {
        let n = DingTalkNotifier::new("abc", Some("SECabc".to_string()));
        let a = n.signed_url(1_700_000_000_000).unwrap();
        let b = n.signed_url(1_700_000_000_000).unwrap();
        let c = n.signed_url(1_700_000_000_001).unwrap();
        assert!(a.contains("&timestamp=1700000000000&sign="));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn markdown_payload_shape() {
        let notification = Notification {
            subject: "Spot alarm".to_string(),
            body: "| a | b |".to_string(),
            format: MessageFormat::Markdown,
            rule_id: "hz".to_string(),
            classification: None,
            count: 0,
        };
        let payload = robot_payload(&notification);
        assert_eq!(payload["msgtype"], "markdown");
        assert_eq!(payload["markdown"]["title"], "Spot alarm");
        assert_eq!(payload["markdown"]["text"], "| a | b |");
    }

    #[test]
    fn text_payload_joins_subject_and_body() {
        let notification = Notification {
            subject: "Spot alarm".to_string(),
            body: "line".to_string(),
            format: MessageFormat::Text,
            rule_id: "hz".to_string(),
            classification: None,
            count: 0,
        };
        let payload = robot_payload(&notification);
        assert_eq!(payload["msgtype"], "text");
        assert_eq!(payload["text"]["content"], "Spot alarm\nline");
    }
}
