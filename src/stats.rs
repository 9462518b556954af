//! Offline parser for the "stats for nerds" text blob.
//!
//! The blob format belongs to the site, not to us, so every field is an
//! independent best-effort pattern match: a field that does not match is
//! `None`, and no input — empty, garbage, already-parsed — can make the
//! parser fail.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::telemetry::{StatsValue, TelemetryCollection, TelemetryRecord};

/// Fixed-key extraction of one stats blob. Unmatched fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedStats {
    pub video_id: Option<String>,
    pub viewport: Option<String>,
    pub dropped_frames: Option<String>,
    pub current_res: Option<String>,
    pub optimal_res: Option<String>,
    pub volume: Option<String>,
    pub normalized_volume: Option<String>,
    pub codecs: Option<String>,
    pub audio_codec: Option<String>,
    pub connection_speed: Option<String>,
    pub network_activity: Option<String>,
    pub buffer_health: Option<String>,
    pub live_mode: Option<String>,
    pub mystery_text: Option<String>,
    pub date: Option<String>,
}

struct Extractor {
    video_id: Regex,
    viewport: Regex,
    dropped_frames: Regex,
    current_res: Regex,
    optimal_res: Regex,
    volume: Regex,
    normalized_volume: Regex,
    codecs: Regex,
    audio_codec: Regex,
    connection_speed: Regex,
    network_activity: Regex,
    buffer_health: Regex,
    live_mode: Regex,
    mystery_text: Regex,
    date: Regex,
}

impl Extractor {
    fn shared() -> &'static Extractor {
        static EXTRACTOR: OnceLock<Extractor> = OnceLock::new();
        EXTRACTOR.get_or_init(|| {
            let re = |pattern: &str| Regex::new(pattern).expect("hand-written pattern");
            Extractor {
                video_id: re(r"Video ID / sCPN ([\w-]+) /"),
                viewport: re(r"Viewport / Frames ([\dx]+(?:\*\d\.\d+)?)"),
                dropped_frames: re(r"Viewport / Frames .*? / (\d+ dropped of \d+|-)"),
                current_res: re(r"Current / Optimal Res ([\dx@]+)"),
                optimal_res: re(r"Current / Optimal Res [\dx@]+ / ([\dx@]+)"),
                volume: re(r"Volume / Normalized ([\d%]+)"),
                normalized_volume: re(r"Volume / Normalized [\d%]+ / ([\w\s().%-]+)\n"),
                codecs: re(r"Codecs (.*?) /"),
                audio_codec: re(r"Codecs .*? / (.*?)\n"),
                connection_speed: re(r"Connection Speed ([\d,]+ Kbps)"),
                network_activity: re(r"Network Activity ([\d.]+ [KM]B)"),
                buffer_health: re(r"Buffer Health ([\d.]+ s)"),
                live_mode: re(r"Live Mode (.*?)\n"),
                mystery_text: re(r"Mystery Text (.*?)\n"),
                date: re(r"Date (.*)"),
            }
        })
    }
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Extract the known fields from one raw stats blob. Pure and total; each
/// field is matched independently of the others.
pub fn parse_stats_block(text: &str) -> ParsedStats {
    let ex = Extractor::shared();
    ParsedStats {
        video_id: capture(&ex.video_id, text),
        viewport: capture(&ex.viewport, text),
        dropped_frames: capture(&ex.dropped_frames, text),
        current_res: capture(&ex.current_res, text),
        optimal_res: capture(&ex.optimal_res, text),
        volume: capture(&ex.volume, text),
        normalized_volume: capture(&ex.normalized_volume, text),
        codecs: capture(&ex.codecs, text),
        audio_codec: capture(&ex.audio_codec, text),
        connection_speed: capture(&ex.connection_speed, text),
        network_activity: capture(&ex.network_activity, text),
        buffer_health: capture(&ex.buffer_health, text),
        live_mode: capture(&ex.live_mode, text),
        mystery_text: capture(&ex.mystery_text, text),
        date: capture(&ex.date, text),
    }
}

/// A sample after offline parsing: same timestamp, fixed-key stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedSample {
    pub timestamp: f64,
    pub stats: ParsedStats,
}

/// A telemetry record after offline parsing. Metadata is carried over
/// verbatim; only the samples' stats change shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub iteration: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_secs: Option<f64>,
    #[serde(default)]
    pub samples: Vec<ParsedSample>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn blob_of(stats: &StatsValue) -> String {
    match stats {
        StatsValue::Text(text) => text.clone(),
        // Table-style stats are rendered back to "label value" lines so the
        // same extractors apply (they simply miss on foreign labels).
        StatsValue::Fields(fields) => fields
            .iter()
            .map(|(label, value)| format!("{} {}", label, value))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn parse_record(record: &TelemetryRecord) -> ParsedRecord {
    ParsedRecord {
        iteration: record.iteration,
        query: record.query.clone(),
        source_url: record.source_url.clone(),
        duration_secs: record.duration_secs,
        watched_secs: record.watched_secs,
        samples: record
            .samples
            .iter()
            .map(|s| ParsedSample {
                timestamp: s.timestamp,
                stats: parse_stats_block(&blob_of(&s.stats)),
            })
            .collect(),
        error: record.error.clone(),
    }
}

/// Parse every sample of every record in the collection.
pub fn parse_collection(collection: &TelemetryCollection) -> Vec<ParsedRecord> {
    collection.records.iter().map(parse_record).collect()
}

/// Load a telemetry file, parse each sample's stats blob, and write the
/// result to a new pretty-printed JSON file. The input file is not touched.
pub async fn parse_telemetry_file(input: &Path, output: &Path) -> anyhow::Result<usize> {
    let collection = TelemetryCollection::load(input).await?;
    let parsed = parse_collection(&collection);
    let json = serde_json::to_string_pretty(&parsed)?;
    tokio::fs::write(output, json).await?;
    Ok(parsed.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = "Video ID / sCPN dQw4w9WgXcQ / 123 456\n\
                        Viewport / Frames 1280x720*2.00 / 4 dropped of 900\n\
                        Current / Optimal Res 1280x720@30 / 1920x1080@30\n\
                        Volume / Normalized 100% / 100% (content loudness 2.2dB)\n\
                        Codecs avc1.64001F (137) / opus (251)\n\
                        Connection Speed 12,345 Kbps\n\
                        Network Activity 1.25 MB\n\
                        Buffer Health 28.52 s\n\
                        Mystery Text s:4 t:9.38 b:0.000-38.901\n\
                        Date Sat Aug 01 2026 12:00:00 GMT+0000";

    #[test]
    fn extracts_the_usual_fields() {
        let parsed = parse_stats_block(BLOB);
        assert_eq!(parsed.video_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(parsed.viewport.as_deref(), Some("1280x720*2.00"));
        assert_eq!(parsed.dropped_frames.as_deref(), Some("4 dropped of 900"));
        assert_eq!(parsed.current_res.as_deref(), Some("1280x720@30"));
        assert_eq!(parsed.optimal_res.as_deref(), Some("1920x1080@30"));
        assert_eq!(parsed.connection_speed.as_deref(), Some("12,345 Kbps"));
        assert_eq!(parsed.buffer_health.as_deref(), Some("28.52 s"));
        assert!(parsed.live_mode.is_none());
    }

    #[test]
    fn empty_input_parses_to_all_none() {
        assert_eq!(parse_stats_block(""), ParsedStats::default());
    }

    #[test]
    fn unavailable_marker_parses_to_all_none() {
        assert_eq!(
            parse_stats_block(crate::telemetry::UNAVAILABLE),
            ParsedStats::default()
        );
    }
}
