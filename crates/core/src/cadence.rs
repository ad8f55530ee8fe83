// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cadence schedules and due-evaluation.
//!
//! A cadence is a `(every, unit)` period attached to a stream. The scheduler
//! compares `now` against a persisted last-run marker to decide whether a
//! cadence fires. Config parsing is lenient: a malformed entry is skipped,
//! never an error that stops the scheduler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key-value namespace (scope = stream) holding last-run markers.
pub const CADENCE_NAMESPACE: &str = "_cadence";

/// Unit of a cadence period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CadenceUnit {
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl CadenceUnit {
    /// Milliseconds in one unit. A month is fixed at 30 days.
    pub fn ms(self) -> u64 {
        match self {
            CadenceUnit::Minutes => 60_000,
            CadenceUnit::Hours => 3_600_000,
            CadenceUnit::Days => 86_400_000,
            CadenceUnit::Weeks => 604_800_000,
            CadenceUnit::Months => 2_592_000_000,
        }
    }
}

impl fmt::Display for CadenceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CadenceUnit::Minutes => write!(f, "minutes"),
            CadenceUnit::Hours => write!(f, "hours"),
            CadenceUnit::Days => write!(f, "days"),
            CadenceUnit::Weeks => write!(f, "weeks"),
            CadenceUnit::Months => write!(f, "months"),
        }
    }
}

/// A `(every, unit)` period. `every` must be positive to be valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cadence {
    pub every: u64,
    pub unit: CadenceUnit,
}

impl Cadence {
    pub fn is_valid(&self) -> bool {
        self.every > 0
    }
}

/// Period of a cadence in milliseconds.
pub fn cadence_to_ms(cadence: &Cadence) -> u64 {
    cadence.every.saturating_mul(cadence.unit.ms())
}

/// Whether a cadence is due: no marker yet, or the period has elapsed.
pub fn is_due(now_ms: u64, last_run_ms: Option<u64>, cadence: &Cadence) -> bool {
    match last_run_ms {
        None => true,
        Some(last) => now_ms.saturating_sub(last) >= cadence_to_ms(cadence),
    }
}

/// One named cadence entry from a stream's cadence config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CadenceEntry {
    pub name: String,
    #[serde(rename = "playbookSlug")]
    pub playbook_slug: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub schedule: Option<Cadence>,
}

fn default_enabled() -> bool {
    true
}

impl CadenceEntry {
    /// Marker key for this entry's last-run timestamp.
    pub fn marker_key(&self) -> String {
        format!("{}:lastRun", self.name)
    }
}

/// Parse a stream's cadence config JSON into entries.
///
/// Accepts a JSON array of entry objects. Entries that fail to deserialize
/// or carry a zero-period schedule are dropped; a non-array document yields
/// an empty list.
pub fn parse_cadence_config(config_json: &str) -> Vec<CadenceEntry> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(config_json) else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value::<CadenceEntry>(item.clone()).ok())
        .filter(|entry| entry.schedule.map(|s| s.is_valid()).unwrap_or(false))
        .collect()
}

#[cfg(test)]
#[path = "cadence_tests.rs"]
mod tests;
