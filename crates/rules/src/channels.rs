//! Builds notifier instances from a rule's targets.

use std::sync::Arc;

use spot_core::config::DingTalkConfig;
use spot_notify::{DingTalkNotifier, Notifier, NotifyError, TemplateRenderer, WebhookNotifier};

use crate::schema::{ChannelType, TargetChannel};

/// Construct one notifier per target, failing on the first bad target.
pub fn build_channels(
    targets: &[TargetChannel],
    dingtalk: &DingTalkConfig,
    renderer: &Arc<TemplateRenderer>,
) -> Result<Vec<Arc<dyn Notifier>>, NotifyError> {
    targets
        .iter()
        .map(|target| build_channel(target, dingtalk, renderer))
        .collect()
}

pub fn build_channel(
    target: &TargetChannel,
    dingtalk: &DingTalkConfig,
    renderer: &Arc<TemplateRenderer>,
) -> Result<Arc<dyn Notifier>, NotifyError> {
    match target.channel {
        ChannelType::Dingtalk => {
            let notifier = DingTalkNotifier::resolve(
                dingtalk,
                target.conversation.as_deref(),
                target.token.as_deref(),
                target.secret.as_deref(),
            )?;
            Ok(Arc::new(notifier))
        }
        ChannelType::Webhook => {
            let url = target
                .url
                .clone()
                .ok_or_else(|| NotifyError::Config("webhook target requires a url".to_string()))?;
            let notifier = WebhookNotifier::from_config(
                url,
                target.method.clone(),
                target.headers.clone(),
                target.body_template.clone(),
                Arc::clone(renderer),
            )?;
            Ok(Arc::new(notifier))
        }
    }
}
