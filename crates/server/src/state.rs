use std::sync::Arc;

use chrono::{DateTime, Utc};

use spot_core::Config;
use spot_rules::{AlarmScheduler, PipelineEnv};

/// Shared handler state.
pub struct AppState {
    pub config: Config,
    pub scheduler: Arc<AlarmScheduler>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, scheduler: Arc<AlarmScheduler>) -> Self {
        Self {
            config,
            scheduler,
            started_at: Utc::now(),
        }
    }

    /// Pipeline dependencies shared by scheduled and ad-hoc cycles.
    pub fn env(&self) -> &Arc<PipelineEnv> {
        self.scheduler.env()
    }
}
