//! Timeframe Bundle (§4.D) — per-`(symbol, interval)` cache of bars plus the
//! indicator kernel's output, with `O(log n)` as-of lookups.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::config::KernelConfig;
use crate::domain::{Bar, EnvelopeBand, Interval, MarketState, PatternEvent, PldotPoint};
use crate::indicators;

/// Bars, PLdot/envelope/state series (index-aligned with `bars`), and the
/// discrete pattern events detected over the whole series, for one
/// `(symbol, interval)`.
pub struct TimeframeBundle {
    bars: Vec<Bar>,
    pldots: Vec<Option<PldotPoint>>,
    envelopes: Vec<Option<EnvelopeBand>>,
    states: Vec<Option<MarketState>>,
    patterns: Vec<PatternEvent>,
}

impl TimeframeBundle {
    pub fn build(bars: Vec<Bar>, cfg: &KernelConfig) -> Self {
        let out = indicators::run(&bars, cfg);
        Self {
            bars,
            pldots: out.pldots,
            envelopes: out.envelopes,
            states: out.states,
            patterns: out.patterns,
        }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn patterns(&self) -> &[PatternEvent] {
        &self.patterns
    }

    /// Index of the last bar with `timestamp <= as_of`, or `None` if every
    /// bar is after `as_of`.
    fn index_at(&self, as_of: DateTime<Utc>) -> Option<usize> {
        match self.bars.binary_search_by_key(&as_of, |b| b.timestamp) {
            Ok(idx) => Some(idx),
            Err(0) => None,
            Err(idx) => Some(idx - 1),
        }
    }

    pub fn pldot_at(&self, as_of: DateTime<Utc>) -> Option<&PldotPoint> {
        self.index_at(as_of).and_then(|i| self.pldots[i].as_ref())
    }

    pub fn envelope_at(&self, as_of: DateTime<Utc>) -> Option<&EnvelopeBand> {
        self.index_at(as_of).and_then(|i| self.envelopes[i].as_ref())
    }

    pub fn state_at(&self, as_of: DateTime<Utc>) -> Option<&MarketState> {
        self.index_at(as_of).and_then(|i| self.states[i].as_ref())
    }

    pub fn bar_at(&self, as_of: DateTime<Utc>) -> Option<&Bar> {
        self.index_at(as_of).map(|i| &self.bars[i])
    }

    /// Patterns whose `[start, end]` window overlaps `[from, to]`.
    pub fn patterns_in(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<&PatternEvent> {
        self.patterns.iter().filter(|p| p.start <= to && p.end >= from).collect()
    }
}

/// Owns one [`TimeframeBundle`] per `(symbol, interval)`, recomputed whenever
/// new bars invalidate it.
#[derive(Default)]
pub struct BundleStore {
    bundles: HashMap<(String, Interval), TimeframeBundle>,
}

impl BundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str, interval: Interval) -> Option<&TimeframeBundle> {
        self.bundles.get(&(symbol.to_string(), interval))
    }

    /// Replace the bundle for `(symbol, interval)`, rebuilding the full
    /// indicator kernel pass from `bars`. Callers own deciding when a bundle
    /// is stale (e.g. new bars landed in the Bar Store).
    pub fn invalidate(&mut self, symbol: &str, interval: Interval, bars: Vec<Bar>, cfg: &KernelConfig) {
        self.bundles.insert((symbol.to_string(), interval), TimeframeBundle::build(bars, cfg));
    }

    pub fn remove(&mut self, symbol: &str, interval: Interval) {
        self.bundles.remove(&(symbol.to_string(), interval));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::test_support::make_bars;

    #[test]
    fn as_of_lookups_return_last_bar_not_after_timestamp() {
        let bars = make_bars(&[
            (100.0, 102.0, 98.0, 101.0),
            (101.0, 103.0, 99.0, 102.0),
            (102.0, 104.0, 100.0, 103.0),
            (103.0, 106.0, 101.0, 105.0),
        ]);
        let ts2 = bars[2].timestamp;
        let bundle = TimeframeBundle::build(bars, &KernelConfig::default());
        let pldot = bundle.pldot_at(ts2).unwrap();
        assert_eq!(pldot.source_timestamp, ts2);
    }

    #[test]
    fn as_of_before_any_bar_returns_none() {
        let bars = make_bars(&[(100.0, 102.0, 98.0, 101.0), (101.0, 103.0, 99.0, 102.0)]);
        let before = bars[0].timestamp - chrono::Duration::minutes(1);
        let bundle = TimeframeBundle::build(bars, &KernelConfig::default());
        assert!(bundle.bar_at(before).is_none());
    }

    #[test]
    fn bundle_store_invalidate_and_get() {
        let bars = make_bars(&[(100.0, 102.0, 98.0, 101.0), (101.0, 103.0, 99.0, 102.0)]);
        let mut store = BundleStore::new();
        assert!(store.get("TEST", Interval::M5).is_none());
        store.invalidate("TEST", Interval::M5, bars, &KernelConfig::default());
        assert!(store.get("TEST", Interval::M5).is_some());
    }
}
