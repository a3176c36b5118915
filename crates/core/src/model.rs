//! Shared price and query types.
//!
//! Everything here is a plain value: groups come in from a price source,
//! snapshots go out to the filter and classifier, and nothing is persisted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State key of an instance offering: `instanceTypeId#zoneId`.
pub fn price_key(instance_type_id: &str, zone_id: &str) -> String {
    format!("{}#{}", instance_type_id, zone_id)
}

// ── Source data ───────────────────────────────────────────────

/// One observation from the spot price history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub spot_price: f64,
    pub origin_price: f64,
}

/// All samples for one instance type in one zone over the resolution window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceGroup {
    pub instance_type_id: String,
    pub zone_id: String,
    pub core_count: u32,
    pub memory_gib: f64,
    pub samples: Vec<PriceSample>,
}

impl PriceGroup {
    pub fn key(&self) -> String {
        price_key(&self.instance_type_id, &self.zone_id)
    }
}

// ── Snapshot ──────────────────────────────────────────────────

/// A priced instance offering, recomputed every evaluation cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancePrice {
    pub instance_type_id: String,
    pub zone_id: String,
    pub core_count: u32,
    pub memory_gib: f64,
    /// Latest spot price divided by core count.
    pub price_per_core: f64,
    pub spot_price: f64,
    pub origin_price: f64,
    /// `10 * spot / origin`, so 0..10 where lower is cheaper.
    pub discount: f64,
    /// RMS deviation of all samples from `0.1 * origin_price`.
    pub volatility: f64,
}

impl InstancePrice {
    pub fn key(&self) -> String {
        price_key(&self.instance_type_id, &self.zone_id)
    }

    /// The value a threshold is compared against.
    pub fn judged_value(&self, field: JudgedField) -> f64 {
        match field {
            JudgedField::PricePerCore => self.price_per_core,
            JudgedField::Discount => self.discount,
            JudgedField::Volatility => self.volatility,
        }
    }
}

/// Which [`InstancePrice`] value a rule's threshold applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgedField {
    #[default]
    PricePerCore,
    Discount,
    Volatility,
}

impl JudgedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            JudgedField::PricePerCore => "price_per_core",
            JudgedField::Discount => "discount",
            JudgedField::Volatility => "volatility",
        }
    }
}

impl fmt::Display for JudgedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification class of one batch of changed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Ad-hoc query without a threshold.
    OnceQuery,
    /// Every changed entry is at or above the threshold.
    Alarm,
    /// Every changed entry is below the threshold.
    Recover,
    /// Changed entries on both sides.
    Monitor,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::OnceQuery => "once_query",
            Classification::Alarm => "alarm",
            Classification::Recover => "recover",
            Classification::Monitor => "monitor",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A changed batch after threshold partitioning.
///
/// `items` is the batch in snapshot order; `above` and `below` partition it
/// (both empty for [`Classification::OnceQuery`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classified {
    pub classification: Classification,
    pub threshold: Option<f64>,
    pub judged_by: JudgedField,
    pub items: Vec<InstancePrice>,
    pub above: Vec<InstancePrice>,
    pub below: Vec<InstancePrice>,
}

// ── Query constraints ─────────────────────────────────────────

fn default_region() -> String {
    "cn-hangzhou".to_string()
}

fn default_family() -> String {
    "ecs.ec1,ecs.sn1ne,ecs.c5,ecs.c6".to_string()
}

/// Resource constraints handed to a price source.
///
/// Field names double as the ad-hoc query-string parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceQuery {
    pub region: String,
    /// Minimum vCPU count.
    pub cpu: u32,
    /// Minimum memory in GiB.
    pub memory: f64,
    pub max_cpu: u32,
    pub max_memory: f64,
    /// Comma-separated instance family prefixes; empty matches everything.
    pub family: String,
    /// Discount at or below which an offering counts as a bargain.
    pub cutoff: f64,
    /// Maximum number of ranked entries kept per cycle.
    pub limit: usize,
    /// Price history window in days.
    pub resolution: u32,
}

impl Default for ResourceQuery {
    fn default() -> Self {
        Self {
            region: default_region(),
            cpu: 4,
            memory: 2.0,
            max_cpu: 128,
            max_memory: 64.0,
            family: default_family(),
            cutoff: 2.0,
            limit: 50,
            resolution: 7,
        }
    }
}

impl ResourceQuery {
    /// Non-empty family filters.
    pub fn families(&self) -> Vec<&str> {
        self.family
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect()
    }

    pub fn matches_family(&self, instance_type_id: &str) -> bool {
        let families = self.families();
        families.is_empty() || families.iter().any(|f| instance_type_id.contains(f))
    }

    /// Whether an instance shape lies within the cpu/memory bounds (inclusive).
    pub fn matches_shape(&self, cores: u32, memory_gib: f64) -> bool {
        cores >= self.cpu
            && cores <= self.max_cpu
            && memory_gib >= self.memory
            && memory_gib <= self.max_memory
    }

    /// One-line description used in notification footers.
    pub fn conditions(&self) -> String {
        format!(
            "region={}, cpu={}-{}, memory={}-{}GiB, family={}, cutoff={}",
            self.region,
            self.cpu,
            self.max_cpu,
            self.memory,
            self.max_memory,
            if self.family.is_empty() { "*" } else { self.family.as_str() },
            self.cutoff,
        )
    }
}
