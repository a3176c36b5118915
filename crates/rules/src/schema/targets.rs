//! Notification target types for alarm rules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A notification target within a rule.
///
/// Only the fields relevant to `channel` are read; the rest stay `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetChannel {
    pub channel: ChannelType,
    // DingTalk fields
    /// Conversation title looked up in `DINGTALK_TOKENS`.
    #[serde(default)]
    pub conversation: Option<String>,
    /// Inline robot access token; may contain `${ENV_VAR}` references.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
    // Webhook fields
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub body_template: Option<String>,
}

/// Notification transport types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Dingtalk,
    Webhook,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelType::Dingtalk => "dingtalk",
            ChannelType::Webhook => "webhook",
        }
    }
}
