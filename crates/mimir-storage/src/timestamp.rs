// SPDX-FileCopyrightText: 2026 Mimir Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp helpers.
//!
//! Timestamps are stored as RFC 3339 UTC strings with millisecond precision,
//! matching SQLite's `strftime('%Y-%m-%dT%H:%M:%fZ')`. That format sorts
//! lexicographically, so age cutoffs are plain string comparisons in SQL.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format a UTC instant in the storage format.
pub fn format(ts: DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

/// The current instant in the storage format.
pub fn now() -> String {
    format(Utc::now())
}

/// The storage-format timestamp `days` before now.
pub fn cutoff(days: u32) -> String {
    format(Utc::now() - Duration::days(i64::from(days)))
}

/// Parse a stored timestamp. Accepts the storage format and general RFC 3339.
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, FORMAT) {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Fractional days elapsed between `ts` and `now`. Unparseable or future
/// timestamps count as zero.
pub fn age_days(ts: &str, now: DateTime<Utc>) -> f64 {
    match parse(ts) {
        Some(then) => {
            let secs = (now - then).num_milliseconds() as f64 / 1000.0;
            (secs / 86_400.0).max(0.0)
        }
        None => 0.0,
    }
}
