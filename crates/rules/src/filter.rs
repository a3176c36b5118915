//! Per-rule change suppression.
//!
//! A [`ChangeFilter`] remembers the last judged value of every instance it
//! has seen. An instance is reported on first sighting and afterwards only
//! when it crosses the threshold. Entries not seen for the TTL are dropped,
//! so an instance that returns after a long absence counts as new again.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use spot_core::{InstancePrice, JudgedField};

/// Default inactivity window before an entry expires.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq)]
struct FilterEntry {
    last_value: f64,
    last_seen: DateTime<Utc>,
}

/// Change-suppression state owned by exactly one rule.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    entries: HashMap<String, FilterEntry>,
    ttl: chrono::Duration,
}

impl Default for ChangeFilter {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ChangeFilter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }

    /// [`evaluate_at`](Self::evaluate_at) using the current time.
    pub fn evaluate(
        &mut self,
        snapshot: &[InstancePrice],
        threshold: f64,
        field: JudgedField,
    ) -> Vec<InstancePrice> {
        self.evaluate_at(Utc::now(), snapshot, threshold, field)
    }

    /// Return the entries of `snapshot` that changed, in snapshot order.
    ///
    /// Expired entries are purged first. Every entry in the snapshot has its
    /// stored value and last-seen time refreshed, changed or not. A value
    /// that is not a finite number on either side counts as changed.
    pub fn evaluate_at(
        &mut self,
        now: DateTime<Utc>,
        snapshot: &[InstancePrice],
        threshold: f64,
        field: JudgedField,
    ) -> Vec<InstancePrice> {
        let expired = self.expire(now);
        if expired > 0 {
            debug!(expired, "expired change-filter entries");
        }

        let mut changed = Vec::new();
        for item in snapshot {
            let value = item.judged_value(field);
            let entry = FilterEntry {
                last_value: value,
                last_seen: now,
            };
            let is_changed = match self.entries.insert(item.key(), entry) {
                None => true,
                Some(previous) => crossed(previous.last_value, value, threshold, &item.key()),
            };
            if is_changed {
                changed.push(item.clone());
            }
        }
        changed
    }

    /// Drop entries whose last sighting is at least one TTL old.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, e| now - e.last_seen < ttl);
        before - self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Last judged value recorded for `key`.
    pub fn last_value(&self, key: &str) -> Option<f64> {
        self.entries.get(key).map(|e| e.last_value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `old` and `new` sit on different sides of `threshold`.
fn crossed(old: f64, new: f64, threshold: f64, key: &str) -> bool {
    if !(old.is_finite() && new.is_finite() && threshold.is_finite()) {
        warn!(key, old, new, threshold, "non-finite value in change filter; reporting as changed");
        return true;
    }
    (old >= threshold) != (new >= threshold)
}
