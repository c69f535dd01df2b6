use crate::model::MetricTimestamp;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Offset layouts RFC 3339 does not cover, such as `+0200`.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Layouts accepted when the source timestamp carries no offset; read as UTC.
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Output layout of the metric `timestamp` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimestampFormat {
    /// ISO-8601 UTC with millisecond precision, e.g. `2023-02-03T04:05:06.777Z`.
    #[default]
    #[serde(rename = "iso")]
    Iso,
    /// Epoch milliseconds as an integer.
    #[serde(rename = "epochmillis")]
    EpochMillis,
    /// Epoch milliseconds as a decimal string.
    #[serde(rename = "epochmillis_str")]
    EpochMillisString,
}

/// Parses audit timestamps, buckets them and formats them for output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimestampNormalizer {
    format: TimestampFormat,
    interval: Option<i64>,
}

impl TimestampNormalizer {
    /// `interval` is in seconds; zero or negative disables bucketing.
    pub fn new(format: TimestampFormat, interval: Option<i64>) -> Self {
        Self {
            format,
            interval: interval.filter(|secs| *secs > 0),
        }
    }

    /// Returns `None` for an absent or unparsable timestamp.
    pub fn normalize(&self, raw: Option<&str>) -> Option<MetricTimestamp> {
        let mut ts = parse_timestamp(raw?)?;
        if let Some(interval) = self.interval {
            let floored = ts.timestamp().div_euclid(interval) * interval;
            ts = Utc.timestamp_opt(floored, 0).single()?;
        }
        Some(self.format(ts))
    }

    pub fn format(&self, ts: DateTime<Utc>) -> MetricTimestamp {
        match self.format {
            TimestampFormat::Iso => {
                MetricTimestamp::Iso(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            TimestampFormat::EpochMillis => MetricTimestamp::EpochMillis(ts.timestamp_millis()),
            TimestampFormat::EpochMillisString => {
                MetricTimestamp::EpochMillisString(ts.timestamp_millis().to_string())
            }
        }
    }
}

/// Parses an ISO-8601 timestamp with an offset, or a naive one assumed to
/// be UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|layout| DateTime::parse_from_str(raw, layout).ok())
    {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(raw, layout).ok())
        .map(|naive| naive.and_utc())
}
