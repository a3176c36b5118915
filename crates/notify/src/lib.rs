//! Notification delivery for spot price alarms.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - DingTalk robot and generic webhook notifier implementations
//! - Pure message rendering for classified price batches
//! - Minijinja template rendering for custom message bodies
//! - Dispatcher that routes notifications to configured channels

pub mod dingtalk;
pub mod dispatcher;
pub mod env_refs;
pub mod render;
pub mod templating;
pub mod traits;
pub mod webhook;

pub use dingtalk::DingTalkNotifier;
pub use dispatcher::Dispatcher;
pub use render::{render_message, RenderContext, RenderOptions};
pub use templating::TemplateRenderer;
pub use traits::{DispatchResult, MessageFormat, Notification, Notifier, NotifyError};
pub use webhook::WebhookNotifier;
