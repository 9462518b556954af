//! Serialization round-trip and the offline parse step over real files.

use std::collections::BTreeMap;

use vidprobe::{
    parse_telemetry_file, Sample, StatsValue, TelemetryCollection, TelemetryRecord,
};

fn sample_collection() -> TelemetryCollection {
    let mut collection = TelemetryCollection::new();

    let mut first = TelemetryRecord::new(1);
    first.query = Some("tiempo".to_string());
    first.source_url = Some("https://www.youtube.com/watch?v=abc".to_string());
    first.duration_secs = Some(212.4);
    first.watched_secs = Some(17.0);
    first.samples.push(Sample {
        timestamp: 1.0,
        stats: StatsValue::Text("Buffer Health 9.11 s\nConnection Speed 8,000 Kbps".into()),
    });
    first.samples.push(Sample {
        timestamp: 2.0,
        stats: StatsValue::unavailable(),
    });
    collection.push(first);

    let mut second = TelemetryRecord::new(2);
    second.source_url = Some("https://twitch-tools.example/random".to_string());
    let mut fields = BTreeMap::new();
    fields.insert("Video Resolution".to_string(), "1280x720".to_string());
    fields.insert("FPS".to_string(), "30".to_string());
    second.samples.push(Sample {
        timestamp: 1.1,
        stats: StatsValue::Fields(fields),
    });
    collection.push(second);

    collection.push(TelemetryRecord::new(3).fail("panel-never-visible"));

    collection
}

#[tokio::test]
async fn save_then_load_preserves_records_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("telemetry.json");

    let original = sample_collection();
    original.save(&path).await.unwrap();

    let loaded = TelemetryCollection::load(&path).await.unwrap();
    assert_eq!(loaded, original);
    assert_eq!(
        loaded.records.iter().map(|r| r.iteration).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn save_overwrites_the_previous_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("telemetry.json");

    sample_collection().save(&path).await.unwrap();

    let mut small = TelemetryCollection::new();
    small.push(TelemetryRecord::new(1));
    small.save(&path).await.unwrap();

    let loaded = TelemetryCollection::load(&path).await.unwrap();
    assert_eq!(loaded.len(), 1);
}

#[tokio::test]
async fn output_file_is_a_pretty_json_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("telemetry.json");

    sample_collection().save(&path).await.unwrap();
    let text = tokio::fs::read_to_string(&path).await.unwrap();

    assert!(text.trim_start().starts_with('['));
    assert!(text.contains('\n'), "expected pretty-printed output");

    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2]["error"], "panel-never-visible");
    assert!(records[2]["samples"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn parse_step_writes_a_new_file_and_keeps_the_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("telemetry.json");
    let output = dir.path().join("telemetry_parsed.json");

    sample_collection().save(&input).await.unwrap();
    let before = tokio::fs::read_to_string(&input).await.unwrap();

    let count = parse_telemetry_file(&input, &output).await.unwrap();
    assert_eq!(count, 3);

    let after = tokio::fs::read_to_string(&input).await.unwrap();
    assert_eq!(before, after, "parse must not mutate its input file");

    let parsed: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(&output).await.unwrap()).unwrap();
    let records = parsed.as_array().unwrap();
    assert_eq!(records.len(), 3);

    // First record: blob fields extracted, unknown fields null
    let stats = &records[0]["samples"][0]["stats"];
    assert_eq!(stats["buffer_health"], "9.11 s");
    assert_eq!(stats["connection_speed"], "8,000 Kbps");
    assert_eq!(stats["video_id"], serde_json::Value::Null);

    // Unavailable marker parses to all-null, not to an error
    let stats = &records[0]["samples"][1]["stats"];
    assert_eq!(stats["buffer_health"], serde_json::Value::Null);

    // Failure records survive the parse step with their error intact
    assert_eq!(records[2]["error"], "panel-never-visible");
}
