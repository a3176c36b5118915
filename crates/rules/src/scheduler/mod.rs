//! Per-rule scheduling.
//!
//! Every registered [`AlarmRule`](crate::schema::AlarmRule) gets its own
//! tokio task that sleeps until the next fire time, runs one evaluation
//! cycle against the rule's change filter, and repeats until shutdown.

mod core;
pub(crate) mod cron;
mod job;


pub use self::core::{AlarmScheduler, RunNow, SkippedRule};
pub use self::cron::{parse_every, RuleSchedule};
pub use self::job::{JobStats, RuleJob, RuleStatus};
