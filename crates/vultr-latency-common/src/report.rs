//! Probe output contract
//!
//! The probe program prints a JSON object mapping each endpoint name to its
//! `{min, avg, max}` round-trip time in milliseconds. Endpoints that produced
//! no successful sample are absent from the object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stats::LatencyStats;

/// Round-trip statistics for one endpoint, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeStats {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

impl ProbeStats {
    /// Convert computed statistics, returning `None` when there were no samples.
    pub fn from_latency(stats: &LatencyStats) -> Option<Self> {
        if stats.is_empty() {
            return None;
        }
        Some(Self {
            min: stats.min,
            avg: stats.avg,
            max: stats.max,
        })
    }

    /// An average usable as a measurement
    pub fn has_valid_avg(&self) -> bool {
        self.avg.is_finite() && self.avg >= 0.0
    }
}

/// Per-endpoint results of one probe run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeReport(BTreeMap<String, ProbeStats>);

impl ProbeReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, stats: ProbeStats) {
        self.0.insert(name.into(), stats);
    }

    pub fn get(&self, name: &str) -> Option<&ProbeStats> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ProbeStats)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse probe stdout.
    ///
    /// The top level must be a JSON object. Entries that are not a
    /// `{min, avg, max}` object are dropped rather than failing the whole report.
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)?;
        Ok(Self(
            raw.into_iter()
                .filter_map(|(name, value)| {
                    serde_json::from_value::<ProbeStats>(value)
                        .ok()
                        .map(|stats| (name, stats))
                })
                .collect(),
        ))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl FromIterator<(String, ProbeStats)> for ProbeReport {
    fn from_iter<I: IntoIterator<Item = (String, ProbeStats)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
