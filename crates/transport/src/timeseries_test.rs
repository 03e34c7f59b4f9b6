//! Timeseries planner tests

use chrono::{DateTime, Utc};
use siphon_config::TimeseriesConfig;
use url::Url;

use crate::error::TransportError;
use crate::timeseries::{Chunk, expand, format_timestamp};

fn spec(period: i64) -> TimeseriesConfig {
    TimeseriesConfig {
        start_name: "start".to_string(),
        end_name: "end".to_string(),
        period,
        layout: None,
    }
}

fn url(query: &str) -> Url {
    Url::parse(&format!("https://api.test/candles?{query}")).unwrap()
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

#[test]
fn chunks_cover_window_contiguously() {
    let chunks = expand(
        &spec(60),
        &url("start=2024-01-01T00:00:00Z&end=2024-01-01T00:03:00Z"),
    )
    .unwrap();

    assert_eq!(
        chunks,
        vec![
            Chunk {
                start: ts("2024-01-01T00:00:00Z"),
                end: ts("2024-01-01T00:01:00Z"),
            },
            Chunk {
                start: ts("2024-01-01T00:01:00Z"),
                end: ts("2024-01-01T00:02:00Z"),
            },
            Chunk {
                start: ts("2024-01-01T00:02:00Z"),
                end: ts("2024-01-01T00:03:00Z"),
            },
        ]
    );

    // Contiguous and increasing: each chunk starts where the previous ended.
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].end, pair[1].start);
        assert!(pair[0].start < pair[0].end);
    }
}

#[test]
fn final_chunk_is_clipped() {
    let chunks = expand(
        &spec(120),
        &url("start=2024-01-01T00:00:00Z&end=2024-01-01T00:03:00Z"),
    )
    .unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1].start, ts("2024-01-01T00:02:00Z"));
    assert_eq!(chunks[1].end, ts("2024-01-01T00:03:00Z"));
}

#[test]
fn oversized_period_yields_single_chunk() {
    let chunks = expand(
        &spec(86_400),
        &url("start=2024-01-01T00:00:00Z&end=2024-01-01T00:03:00Z"),
    )
    .unwrap();

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].start, ts("2024-01-01T00:00:00Z"));
    assert_eq!(chunks[0].end, ts("2024-01-01T00:03:00Z"));
}

#[test]
fn empty_window_yields_no_chunks() {
    let chunks = expand(
        &spec(60),
        &url("start=2024-01-01T00:03:00Z&end=2024-01-01T00:00:00Z"),
    )
    .unwrap();
    assert!(chunks.is_empty());

    let chunks = expand(
        &spec(60),
        &url("start=2024-01-01T00:00:00Z&end=2024-01-01T00:00:00Z"),
    )
    .unwrap();
    assert!(chunks.is_empty());
}

#[test]
fn missing_start_parameter() {
    let err = expand(&spec(60), &url("end=2024-01-01T00:03:00Z")).unwrap_err();
    assert!(matches!(
        err,
        TransportError::MissingTimeseriesField("startName")
    ));
}

#[test]
fn duplicated_end_parameter() {
    let err = expand(
        &spec(60),
        &url("start=2024-01-01T00:00:00Z&end=a&end=b"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        TransportError::MissingTimeseriesField("endName")
    ));
}

#[test]
fn layout_mismatch_is_a_parse_error() {
    let mut spec = spec(60);
    spec.layout = Some("%Y-%m-%d".to_string());

    let err = expand(
        &spec,
        &url("start=2024-01-01T00:00:00Z&end=2024-01-01T00:03:00Z"),
    )
    .unwrap_err();
    assert!(matches!(err, TransportError::UnableToParse("startTime")));
}

#[test]
fn malformed_end_value() {
    let err = expand(
        &spec(60),
        &url("start=2024-01-01T00:00:00Z&end=not-a-time"),
    )
    .unwrap_err();
    assert!(matches!(err, TransportError::UnableToParse("endTime")));
}

#[test]
fn non_positive_period_is_rejected() {
    let err = expand(
        &spec(0),
        &url("start=2024-01-01T00:00:00Z&end=2024-01-01T00:03:00Z"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        TransportError::MissingTimeseriesField("period")
    ));
}

#[test]
fn date_only_layout_parses_and_formats() {
    let mut spec = spec(86_400);
    spec.layout = Some("%Y-%m-%d".to_string());

    let chunks = expand(&spec, &url("start=2024-01-01&end=2024-01-03")).unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(
        format_timestamp(spec.layout.as_deref(), chunks[1].start),
        "2024-01-02"
    );
}

#[test]
fn rfc3339_formatting_uses_z_suffix() {
    assert_eq!(
        format_timestamp(None, ts("2024-01-01T00:01:00Z")),
        "2024-01-01T00:01:00Z"
    );
}

#[test]
fn planner_does_not_mutate_url() {
    let original = url("start=2024-01-01T00:00:00Z&end=2024-01-01T00:03:00Z");
    let before = original.to_string();
    expand(&spec(60), &original).unwrap();
    assert_eq!(original.to_string(), before);
}
