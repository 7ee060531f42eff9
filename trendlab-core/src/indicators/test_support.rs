//! Shared test helpers for the indicator kernel. Not part of the public API.

#![cfg(test)]

use chrono::{DateTime, TimeZone, Utc};

use crate::domain::{Bar, Interval};

/// Build a sequence of 5m bars from `(open, high, low, close)` tuples, one
/// bar every 5 minutes starting at an arbitrary aligned timestamp.
pub fn make_bars(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
    ohlc.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Bar {
            symbol: "TEST".to_string(),
            interval: Interval::M5,
            timestamp: base + chrono::Duration::minutes(5 * i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            is_provisional: false,
        })
        .collect()
}

pub fn ts(minute_offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap() + chrono::Duration::minutes(minute_offset)
}

pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

pub const DEFAULT_EPSILON: f64 = 1e-9;
