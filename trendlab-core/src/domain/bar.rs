//! Bar — the fundamental OHLCV unit and the interval lattice it lives on.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The closed set of intervals the system understands.
///
/// Exactly one of these is configured as the base interval (5m in
/// production); all coarser intervals are derived from it by aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    M1,
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Interval {
    /// Bar period as a `chrono::Duration`.
    pub fn duration(self) -> Duration {
        match self {
            Interval::M1 => Duration::minutes(1),
            Interval::M5 => Duration::minutes(5),
            Interval::M15 => Duration::minutes(15),
            Interval::M30 => Duration::minutes(30),
            Interval::H1 => Duration::hours(1),
            Interval::H4 => Duration::hours(4),
            Interval::D1 => Duration::days(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
        }
    }

    /// Whether `self` is strictly coarser than `base` and an integer multiple
    /// of it — i.e. aggregatable from `base` bars.
    pub fn is_aggregatable_from(self, base: Interval) -> bool {
        self != base && self.duration().num_seconds() % base.duration().num_seconds() == 0
    }

    /// Floor `ts` to the start of the bucket of this interval that contains it.
    pub fn bucket_start(self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.duration().num_seconds();
        let epoch = ts.timestamp();
        let floored = epoch - epoch.rem_euclid(secs);
        DateTime::from_timestamp(floored, 0).expect("valid bucket timestamp")
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLCV bar for a single (symbol, interval) at a bar-close-aligned UTC timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub interval: Interval,
    /// UTC instant of the bar's open (bucket start), per §3's bucket-timestamp rule.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// True while sourced from the live/stream path and not yet finalized.
    pub is_provisional: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BarError {
    #[error("non-positive price: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: String,
        high: String,
        low: String,
        close: String,
    },
    #[error("negative volume: {0}")]
    NegativeVolume(String),
    #[error("low ({low}) exceeds high ({high})")]
    LowExceedsHigh { low: String, high: String },
    #[error("open ({open}) outside [low, high] = [{low}, {high}]")]
    OpenOutOfRange { open: String, low: String, high: String },
    #[error("close ({close}) outside [low, high] = [{low}, {high}]")]
    CloseOutOfRange { close: String, low: String, high: String },
    #[error("timestamp not aligned to interval boundary")]
    Misaligned,
}

impl Bar {
    /// Validate the §3 OHLCV invariants, including timestamp alignment.
    pub fn validate(&self) -> Result<(), BarError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(BarError::NonPositivePrice {
                open: self.open.to_string(),
                high: self.high.to_string(),
                low: self.low.to_string(),
                close: self.close.to_string(),
            });
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume(self.volume.to_string()));
        }
        if self.low > self.high {
            return Err(BarError::LowExceedsHigh {
                low: self.low.to_string(),
                high: self.high.to_string(),
            });
        }
        if self.open < self.low || self.open > self.high {
            return Err(BarError::OpenOutOfRange {
                open: self.open.to_string(),
                low: self.low.to_string(),
                high: self.high.to_string(),
            });
        }
        if self.close < self.low || self.close > self.high {
            return Err(BarError::CloseOutOfRange {
                close: self.close.to_string(),
                low: self.low.to_string(),
                high: self.high.to_string(),
            });
        }
        if self.interval.bucket_start(self.timestamp) != self.timestamp {
            return Err(BarError::Misaligned);
        }
        Ok(())
    }

    /// Typical price, `(high + low + close) / 3`, the building block of PLdot.
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// True range against the previous bar's close (None for the first bar).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            None => self.high - self.low,
            Some(pc) => (self.high - self.low)
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
        }
    }
}

/// Aggregate a contiguous run of base-interval bars (same symbol, strictly
/// increasing timestamps) into one coarser bar per §3/§4.A.
///
/// Returns `None` for an empty slice. The caller is responsible for grouping
/// bars into interval-aligned buckets before calling this; this function
/// simply folds whatever it is given into open=first, high=max, low=min,
/// close=last, volume=sum.
pub fn aggregate_bucket(bars: &[Bar], target: Interval, bucket_start: DateTime<Utc>) -> Option<Bar> {
    let first = bars.first()?;
    let last = bars.last()?;
    let high = bars.iter().fold(f64::MIN, |acc, b| acc.max(b.high));
    let low = bars.iter().fold(f64::MAX, |acc, b| acc.min(b.low));
    let volume = bars.iter().map(|b| b.volume).sum();
    let is_provisional = bars.iter().any(|b| b.is_provisional);
    Some(Bar {
        symbol: first.symbol.clone(),
        interval: target,
        timestamp: bucket_start,
        open: first.open,
        high,
        low,
        close: last.close,
        volume,
        is_provisional,
    })
}
