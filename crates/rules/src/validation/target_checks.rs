//! Notification target validation: required fields, URLs, templates, secrets.

use spot_notify::TemplateRenderer;

use crate::schema::{AlarmRule, ChannelType};

use super::ValidationResult;

pub(super) fn validate_targets(rule: &AlarmRule, result: &mut ValidationResult) {
    if rule.targets.is_empty() {
        result.warn("targets", "No targets configured; alarms will only be logged");
        return;
    }

    for (i, target) in rule.targets.iter().enumerate() {
        let path = format!("targets[{i}]");
        match target.channel {
            ChannelType::Dingtalk => {
                if target.conversation.is_none() && target.token.is_none() {
                    result.error(
                        path.clone(),
                        "DingTalk target requires 'conversation' or 'token'",
                    );
                }
                check_secret_value(&target.token, &format!("{path}.token"), result);
                check_secret_value(&target.secret, &format!("{path}.secret"), result);
            }
            ChannelType::Webhook => {
                match &target.url {
                    None => result.error(format!("{path}.url"), "Webhook target requires 'url'"),
                    Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                        result.error(
                            format!("{path}.url"),
                            format!("URL must start with http:// or https://, got '{url}'"),
                        )
                    }
                    Some(_) => {}
                }
                if let Some(method) = &target.method {
                    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
                        result.error(format!("{path}.method"), format!("Invalid HTTP method '{method}'"));
                    }
                }
                if let Some(template) = &target.body_template {
                    if let Err(e) = TemplateRenderer::new().validate(template) {
                        result.error(format!("{path}.body_template"), e.to_string());
                    }
                }
            }
        }
    }
}

/// Warn if a value looks like a raw secret instead of a `${ENV_VAR}` reference.
fn check_secret_value(value: &Option<String>, path: &str, result: &mut ValidationResult) {
    if let Some(v) = value {
        if !v.is_empty() && !v.contains("${") && looks_like_secret(v) {
            result.warn(
                path,
                "Value looks like a raw secret. Consider using '${ENV_VAR}' syntax instead",
            );
        }
    }
}

/// Token-like strings: 20+ chars mixing letters and digits.
fn looks_like_secret(v: &str) -> bool {
    v.len() >= 20
        && v.chars().any(|c| c.is_ascii_alphabetic())
        && v.chars().any(|c| c.is_ascii_digit())
}
