//! Timeseries expansion planner
//!
//! Partitions a request's `[start, end]` window into fixed-duration chunks,
//! one fetch per chunk. The window is read from the request URL's query
//! parameters; the planner is pure and never mutates its inputs.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use siphon_config::TimeseriesConfig;
use url::Url;

use crate::error::{Result, TransportError};

/// One `[start, end)` slice of the requested window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// Inclusive chunk start.
    pub start: DateTime<Utc>,
    /// Exclusive chunk end (clipped at the window end for the final chunk).
    pub end: DateTime<Utc>,
}

/// Partition the window named by `spec` in `url`'s query into chunks
///
/// Every chunk has length `spec.period` seconds except the final one,
/// which is clipped at the window end. Chunks are contiguous and in
/// increasing order; their union is exactly `[start, end]`. An empty
/// window (`start >= end`) yields an empty plan without error.
///
/// # Errors
///
/// - `MissingTimeseriesField` when the start/end parameter is absent from
///   the query (or appears more than once), or when `period` is not
///   positive.
/// - `UnableToParse` when a window bound does not match the layout.
pub fn expand(spec: &TimeseriesConfig, url: &Url) -> Result<Vec<Chunk>> {
    if spec.period <= 0 {
        return Err(TransportError::MissingTimeseriesField("period"));
    }
    let layout = spec.layout.as_deref();

    let start = parse_timestamp(layout, &query_value(url, &spec.start_name, "startName")?)
        .ok_or(TransportError::UnableToParse("startTime"))?;
    let end = parse_timestamp(layout, &query_value(url, &spec.end_name, "endName")?)
        .ok_or(TransportError::UnableToParse("endTime"))?;

    let step = chrono::Duration::seconds(spec.period);
    let mut chunks = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next = cursor + step;
        chunks.push(Chunk {
            start: cursor,
            end: next.min(end),
        });
        cursor = next;
    }

    Ok(chunks)
}

/// Read a query parameter that must appear exactly once
fn query_value(url: &Url, name: &str, field: &'static str) -> Result<String> {
    let mut values = url
        .query_pairs()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned());

    match (values.next(), values.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(TransportError::MissingTimeseriesField(field)),
    }
}

/// Parse a timestamp with the given layout (RFC 3339 when absent)
///
/// Custom layouts are chrono format strings; zoned, naive-datetime and
/// date-only forms are tried in that order.
pub(crate) fn parse_timestamp(layout: Option<&str>, value: &str) -> Option<DateTime<Utc>> {
    let Some(layout) = layout else {
        return DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|t| t.with_timezone(&Utc));
    };

    if let Ok(t) = DateTime::parse_from_str(value, layout) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(value, layout) {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(value, layout)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Format a chunk bound with the given layout (RFC 3339 when absent)
pub(crate) fn format_timestamp(layout: Option<&str>, t: DateTime<Utc>) -> String {
    match layout {
        None => t.to_rfc3339_opts(SecondsFormat::Secs, true),
        Some(layout) => t.format(layout).to_string(),
    }
}

#[cfg(test)]
#[path = "timeseries_test.rs"]
mod timeseries_test;
