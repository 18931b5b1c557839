use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};

/// Absolute UTC instant.
pub type Timestamp = DateTime<Utc>;

/// Closed time interval `[start, end]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeSpan {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeSpan {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }

    pub fn instant(t: Timestamp) -> Self {
        Self { start: t, end: t }
    }

    /// Interval that opens `lead_minutes` before `t` and closes `trail_minutes` after it.
    pub fn around(t: Timestamp, lead_minutes: f64, trail_minutes: f64) -> Self {
        Self {
            start: add_minutes(t, -lead_minutes),
            end: add_minutes(t, trail_minutes),
        }
    }

    pub fn duration_seconds(&self) -> f64 {
        seconds_between(self.start, self.end).max(0.0)
    }

    /// ISO 8601 interval, `start/end`.
    pub fn to_iso8601(&self) -> String {
        format!("{}/{}", to_iso8601(self.start), to_iso8601(self.end))
    }
}

/// Millisecond resolution; fractional minutes are rounded.
///
/// Results outside the representable range saturate at
/// [`DateTime::<Utc>::MIN_UTC`] / [`DateTime::<Utc>::MAX_UTC`]. NaN leaves `t` unchanged.
pub fn add_minutes(t: Timestamp, minutes: f64) -> Timestamp {
    let ms = (minutes * 60_000.0).round();
    if ms.is_nan() {
        return t;
    }
    let saturated = if ms > 0.0 {
        DateTime::<Utc>::MAX_UTC
    } else {
        DateTime::<Utc>::MIN_UTC
    };
    TimeDelta::try_milliseconds(ms as i64)
        .and_then(|delta| t.checked_add_signed(delta))
        .unwrap_or(saturated)
}

pub fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

pub fn to_iso8601(t: Timestamp) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
