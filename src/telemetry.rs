//! Telemetry record types and JSON persistence.
//!
//! One `TelemetryRecord` per monitored subject; records are finalized exactly
//! once per iteration and the whole collection is written out at the end of
//! the run.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Marker stored when the stats panel had no readable content on a tick.
pub const UNAVAILABLE: &str = "Not Available";

/// The value a single sample captured from the stats panel.
///
/// YouTube's stats-for-nerds panel is one free-text blob; the Twitch player
/// exposes a label/value table. Both serialize as the sample's `stats` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsValue {
    Text(String),
    Fields(BTreeMap<String, String>),
}

impl StatsValue {
    /// The explicit marker recorded instead of failing the tick.
    pub fn unavailable() -> Self {
        StatsValue::Text(UNAVAILABLE.to_string())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StatsValue::Text(t) if t == UNAVAILABLE)
    }
}

/// One timed observation of the stats panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Seconds elapsed since the sampling loop started.
    pub timestamp: f64,
    pub stats: StatsValue,
}

/// Per-subject result container. Mutated only by its own iteration's driver,
/// appended to the collection exactly once, never touched afterward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// 1-based iteration index.
    pub iteration: usize,

    /// Search query that led to this subject (YouTube flow).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    /// URL of the page the stats were read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Full media duration in seconds, when the player exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,

    /// Planned watch time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_secs: Option<f64>,

    /// Chronological samples; empty if the iteration failed before sampling.
    #[serde(default)]
    pub samples: Vec<Sample>,

    /// Failure reason, present only on failed or skipped iterations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TelemetryRecord {
    /// Start a record for the given 1-based iteration.
    pub fn new(iteration: usize) -> Self {
        Self {
            iteration,
            ..Default::default()
        }
    }

    /// Mark the record as failed. Any samples already collected are kept.
    pub fn fail(mut self, reason: impl Into<String>) -> Self {
        self.error = Some(reason.into());
        self
    }
}

/// The ordered records of one run. In-memory only until `save`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryCollection {
    pub records: Vec<TelemetryRecord>,
}

impl TelemetryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: TelemetryRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pretty-printed UTF-8 JSON array, overwriting any previous file.
    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let collection = serde_json::from_str(&content)?;
        Ok(collection)
    }

    /// Fallback when the output file cannot be written: dump everything to
    /// stdout so the collected data is not lost with the process.
    pub fn dump_to_console(&self) {
        match serde_json::to_string_pretty(self) {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("Cannot even serialize telemetry: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_marker_round_trips() {
        let v = StatsValue::unavailable();
        assert!(v.is_unavailable());
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"Not Available\"");
    }

    #[test]
    fn failed_record_keeps_partial_samples() {
        let mut record = TelemetryRecord::new(2);
        record.samples.push(Sample {
            timestamp: 1.0,
            stats: StatsValue::Text("first line".into()),
        });
        let record = record.fail("panel vanished");
        assert_eq!(record.error.as_deref(), Some("panel vanished"));
        assert_eq!(record.samples.len(), 1);
    }

    #[test]
    fn collection_serializes_as_bare_array() {
        let mut collection = TelemetryCollection::new();
        collection.push(TelemetryRecord::new(1));
        let json = serde_json::to_string(&collection).unwrap();
        assert!(json.starts_with('['), "expected a JSON array: {}", json);
    }
}
