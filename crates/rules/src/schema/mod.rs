//! YAML schema for alarm rules.
//!
//! A rule file holds either a single [`AlarmRule`] mapping or a list of
//! them. Query constraints reuse [`spot_core::ResourceQuery`] and render
//! options reuse [`spot_notify::RenderOptions`], so a rule reads:
//!
//! ```yaml
//! id: hangzhou-c6
//! name: Hangzhou c6 per-core price
//! schedule:
//!   cron: "*/10 * * * *"
//! query:
//!   region: cn-hangzhou
//!   family: ecs.c6
//! filter:
//!   threshold: 0.05
//! targets:
//!   - channel: dingtalk
//!     conversation: spot-ops
//! ```

mod rule;
mod targets;

pub use rule::*;
pub use targets::*;
