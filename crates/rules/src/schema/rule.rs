//! Top-level alarm rule types.

use serde::{Deserialize, Serialize};

use spot_core::{JudgedField, ResourceQuery};
use spot_notify::RenderOptions;

use super::targets::TargetChannel;

/// One configured price alarm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlarmRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub schedule: Schedule,
    /// Constraints handed to the price source on every cycle.
    pub query: ResourceQuery,
    pub filter: FilterSpec,
    #[serde(default)]
    pub targets: Vec<TargetChannel>,
    #[serde(default)]
    pub render: RenderOptions,
}

fn default_true() -> bool {
    true
}

/// When a rule fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    /// Cron (5, 6 or 7 fields), an `@descriptor`, or `@every <duration>`.
    pub cron: String,
}

/// Threshold side of a rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterSpec {
    #[serde(default)]
    pub judged_by: JudgedField,
    pub threshold: ThresholdValue,
}

/// A threshold as written in YAML: `0.05` or `"0.05"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ThresholdValue {
    Number(f64),
    Text(String),
}

impl ThresholdValue {
    /// The numeric threshold, if it is a finite number.
    pub fn parse(&self) -> Option<f64> {
        let value = match self {
            ThresholdValue::Number(n) => *n,
            ThresholdValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl std::fmt::Display for ThresholdValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThresholdValue::Number(n) => write!(f, "{n}"),
            ThresholdValue::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl AlarmRule {
    /// Parsed threshold; `None` when the configured value is unusable.
    pub fn threshold(&self) -> Option<f64> {
        self.filter.threshold.parse()
    }
}
