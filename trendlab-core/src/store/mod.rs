//! Bar Store (§4.A) — an in-memory, per-`(symbol, interval)` series store
//! with idempotent upsert and on-read aggregation into coarser intervals.
//!
//! Physical persistence is out of scope (§4.A Non-goals); this plays the
//! role the Parquet cache layer plays upstream, minus the filesystem.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{aggregate_bucket, Bar, BarError, Interval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coverage {
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
    pub bar_count: usize,
}

#[derive(Debug, Default)]
pub struct BarStore {
    series: HashMap<(String, Interval), Vec<Bar>>,
}

impl BarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update bars. Validates every bar first — a single invalid
    /// bar fails the whole batch, nothing is partially applied.
    ///
    /// Precedence on conflicting timestamps: a finalized bar always replaces
    /// whatever was there; a provisional bar only replaces an existing
    /// provisional bar, never a finalized one.
    pub fn upsert_bars(&mut self, bars: Vec<Bar>) -> Result<(), BarError> {
        for b in &bars {
            b.validate()?;
        }
        for bar in bars {
            let key = (bar.symbol.clone(), bar.interval);
            let series = self.series.entry(key).or_default();
            match series.binary_search_by_key(&bar.timestamp, |b| b.timestamp) {
                Ok(idx) => {
                    if bar.is_provisional && !series[idx].is_provisional {
                        continue;
                    }
                    series[idx] = bar;
                }
                Err(idx) => series.insert(idx, bar),
            }
        }
        Ok(())
    }

    /// Bars in `[start, end]` inclusive for `(symbol, interval)`. Falls back
    /// to on-read aggregation from the finest stored interval that can
    /// aggregate into `interval`, when no series is stored directly at
    /// `interval`.
    pub fn get_bars(&self, symbol: &str, interval: Interval, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Bar> {
        if let Some(series) = self.series.get(&(symbol.to_string(), interval)) {
            return slice_range(series, start, end);
        }
        self.synthesize(symbol, interval, start, end)
    }

    pub fn latest_bar(&self, symbol: &str, interval: Interval) -> Option<Bar> {
        self.series.get(&(symbol.to_string(), interval)).and_then(|s| s.last().cloned())
    }

    pub fn coverage(&self, symbol: &str, interval: Interval) -> Option<Coverage> {
        let series = self.series.get(&(symbol.to_string(), interval))?;
        let first = series.first()?.timestamp;
        let last = series.last()?.timestamp;
        Some(Coverage { first, last, bar_count: series.len() })
    }

    /// Synthesize an interval from the finest base interval stored for this
    /// symbol that evenly divides into `target`, aggregating one bucket per
    /// `target` period.
    fn synthesize(&self, symbol: &str, target: Interval, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Bar> {
        let mut candidates: Vec<&Interval> = self
            .series
            .keys()
            .filter(|(s, i)| s == symbol && target.is_aggregatable_from(*i))
            .map(|(_, i)| i)
            .collect();
        candidates.sort_by_key(|i| i.duration());
        let Some(base) = candidates.first().copied() else {
            return Vec::new();
        };
        let base_bars = self.series.get(&(symbol.to_string(), *base)).unwrap();
        let base_slice = slice_range(base_bars, target.bucket_start(start), end);

        let mut out = Vec::new();
        let mut bucket_start = target.bucket_start(start);
        while bucket_start <= end {
            let bucket_end = bucket_start + target.duration();
            let bucket: Vec<Bar> = base_slice
                .iter()
                .filter(|b| b.timestamp >= bucket_start && b.timestamp < bucket_end)
                .cloned()
                .collect();
            if let Some(agg) = aggregate_bucket(&bucket, target, bucket_start) {
                out.push(agg);
            }
            bucket_start = bucket_end;
        }
        out
    }
}

fn slice_range(series: &[Bar], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Bar> {
    series.iter().filter(|b| b.timestamp >= start && b.timestamp <= end).cloned().collect()
}
