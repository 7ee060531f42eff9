//! Multi-Timeframe Coordinator (§4.E) — aligns a higher timeframe (HTF) and
//! trading timeframe (TTF) bundle into one [`AnalysisRecord`], with LRU
//! memoization keyed by bundle content so a re-run over unchanged bars is free.

mod confluence;

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use trendlab_core::bundle::TimeframeBundle;
use trendlab_core::cache::LruCache;
use trendlab_core::domain::{
    AlignmentType, AnalysisRecord, Interval, PatternType, RecommendedAction, RiskLevel, TrendDirection,
};
use trendlab_core::indicators::atr;

use crate::config::CoordinatorConfig;

/// Identifies one memoized analysis. `htf_version`/`ttf_version` are cheap
/// proxies for "has this bundle changed" — bar count plus the latest bar's
/// timestamp — so a stale cache entry is never served after new bars land.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AnalysisKey {
    symbol: String,
    htf: Interval,
    ttf: Interval,
    timestamp: DateTime<Utc>,
    htf_version: (usize, Option<DateTime<Utc>>),
    ttf_version: (usize, Option<DateTime<Utc>>),
}

fn bundle_version(bundle: &TimeframeBundle) -> (usize, Option<DateTime<Utc>>) {
    (bundle.bars().len(), bundle.bars().last().map(|b| b.timestamp))
}

pub struct Coordinator {
    cfg: CoordinatorConfig,
    cache: Mutex<LruCache<AnalysisKey, AnalysisRecord>>,
}

impl Coordinator {
    pub fn new(cfg: CoordinatorConfig) -> Self {
        let capacity = cfg.cache_capacity;
        Self { cfg, cache: Mutex::new(LruCache::new(capacity)) }
    }

    /// Produce the analysis record for `symbol` at `t`, given the HTF and
    /// TTF bundles. Returns `None` if either bundle lacks enough history at
    /// `t` to have a PLdot or market state — there is nothing honest to
    /// report yet, so no record is fabricated.
    pub fn analyze(
        &self,
        symbol: &str,
        htf_interval: Interval,
        htf: &TimeframeBundle,
        ttf_interval: Interval,
        ttf: &TimeframeBundle,
        t: DateTime<Utc>,
        open_position: bool,
    ) -> Option<AnalysisRecord> {
        let key = AnalysisKey {
            symbol: symbol.to_string(),
            htf: htf_interval,
            ttf: ttf_interval,
            timestamp: t,
            htf_version: bundle_version(htf),
            ttf_version: bundle_version(ttf),
        };
        if let Some(cached) = self.cache.lock().unwrap().get(&key) {
            return Some(cached.clone());
        }

        let record = self.compute(symbol, htf_interval, htf, ttf_interval, ttf, t, open_position)?;
        self.cache.lock().unwrap().put(key, record.clone());
        Some(record)
    }

    fn compute(
        &self,
        symbol: &str,
        htf_interval: Interval,
        htf: &TimeframeBundle,
        ttf_interval: Interval,
        ttf: &TimeframeBundle,
        t: DateTime<Utc>,
        open_position: bool,
    ) -> Option<AnalysisRecord> {
        let htf_state = htf.state_at(t)?;
        let ttf_state = ttf.state_at(t)?;
        let htf_pldot = htf.pldot_at(t)?;
        let ttf_pldot = ttf.pldot_at(t)?;

        let htf_trend = htf_state.direction;
        let trading_tf_trend = ttf_state.direction;

        let alignment_score = alignment_score(htf_trend, trading_tf_trend);
        let alignment_type = alignment_type(alignment_score, htf_trend, trading_tf_trend);
        let trade_permitted = htf_trend != TrendDirection::Neutral
            && matches!(alignment_type, AlignmentType::Perfect | AlignmentType::Partial);

        let pldot_distance_percent = if htf_pldot.value.abs() > f64::EPSILON {
            (ttf_pldot.value - htf_pldot.value) / htf_pldot.value * 100.0
        } else {
            0.0
        };

        let htf_candidates = confluence::collect_candidates(htf, htf_interval, t);
        let ttf_candidates = confluence::collect_candidates(ttf, ttf_interval, t);
        let mut candidates = htf_candidates;
        candidates.extend(ttf_candidates);
        let tolerance = self.cfg.clustering_tolerance_pct * htf_pldot.value.abs();
        let confluence_zones = confluence::cluster_candidates(candidates, tolerance);
        let pattern_confluence = confluence_zones.iter().any(|z| z.strength >= 2);

        let pldot_slope_strength = ttf_slope_strength(ttf, t);
        let c_wave_or_push_strength = pattern_strength_term(ttf, t, ttf_interval);
        let lines_confluence_strength = (confluence_zones.iter().map(|z| z.strength).max().unwrap_or(0) as f64 / 3.0).min(1.0);
        let historical_prior = 0.5;

        let signal_strength = 0.30 * alignment_score
            + 0.25 * pldot_slope_strength
            + 0.20 * c_wave_or_push_strength
            + 0.15 * lines_confluence_strength
            + 0.10 * historical_prior;

        let risk_level = risk_level(ttf, t, self.cfg.atr_baseline_window, self.cfg.risk_low_threshold, self.cfg.risk_high_threshold);

        let recommended_action = recommended_action(
            trade_permitted,
            htf_trend,
            signal_strength,
            self.cfg.min_action_signal_strength,
            alignment_type,
            open_position,
        );

        Some(AnalysisRecord {
            symbol: symbol.to_string(),
            htf: htf_interval,
            ttf: ttf_interval,
            timestamp: t,
            htf_trend,
            trading_tf_trend,
            alignment_score,
            alignment_type,
            trade_permitted,
            htf_pldot: htf_pldot.value,
            ttf_pldot: ttf_pldot.value,
            pldot_distance_percent,
            signal_strength,
            risk_level,
            recommended_action,
            pattern_confluence,
            confluence_zones,
        })
    }
}

fn alignment_score(htf_trend: TrendDirection, ttf_trend: TrendDirection) -> f64 {
    match (htf_trend, ttf_trend) {
        (TrendDirection::Neutral, _) | (_, TrendDirection::Neutral) => 0.5,
        (a, b) if a == b => 1.0,
        _ => 0.0,
    }
}

fn alignment_type(score: f64, htf_trend: TrendDirection, ttf_trend: TrendDirection) -> AlignmentType {
    if score >= 1.0 {
        AlignmentType::Perfect
    } else if score >= 0.5 {
        AlignmentType::Partial
    } else if htf_trend != TrendDirection::Neutral && ttf_trend != TrendDirection::Neutral {
        AlignmentType::Conflicting
    } else {
        AlignmentType::Divergent
    }
}

fn recommended_action(
    trade_permitted: bool,
    htf_trend: TrendDirection,
    signal_strength: f64,
    min_strength: f64,
    alignment_type: AlignmentType,
    open_position: bool,
) -> RecommendedAction {
    if trade_permitted && htf_trend == TrendDirection::Up && signal_strength >= min_strength {
        return RecommendedAction::Long;
    }
    if trade_permitted && htf_trend == TrendDirection::Down && signal_strength >= min_strength {
        return RecommendedAction::Short;
    }
    if alignment_type == AlignmentType::Conflicting && open_position {
        return RecommendedAction::Reduce;
    }
    RecommendedAction::Wait
}

/// Normalized slope strength of the TTF PLdot between the bar at `t` and the
/// one before it — the same `|Δ| / (pldot · 1%)` shape the market-state
/// classifier uses internally, recomputed here since that helper is private
/// to the kernel.
pub(crate) fn ttf_slope_strength(ttf: &TimeframeBundle, t: DateTime<Utc>) -> f64 {
    let Some(curr_bar) = ttf.bar_at(t) else { return 0.0 };
    let Some(curr) = ttf.pldot_at(t) else { return 0.0 };
    let prev_ts = curr_bar.timestamp - curr_bar.interval.duration();
    let Some(prev) = ttf.pldot_at(prev_ts) else { return 0.0 };
    if curr.value.abs() < f64::EPSILON {
        return 0.0;
    }
    ((curr.value - prev.value).abs() / (curr.value.abs() * 0.01)).clamp(0.0, 1.0)
}

/// Strength contribution from an active C_WAVE or PLDOT_PUSH pattern
/// overlapping `t`, normalized from the pattern's `strength` (1..=10).
pub(crate) fn pattern_strength_term(ttf: &TimeframeBundle, t: DateTime<Utc>, interval: Interval) -> f64 {
    let window_start = t - interval.duration() * 5;
    ttf.patterns_in(window_start, t)
        .into_iter()
        .filter(|p| matches!(p.pattern_type, PatternType::CWave | PatternType::PldotPush))
        .map(|p| (p.strength as f64 / 10.0).clamp(0.0, 1.0))
        .fold(0.0, f64::max)
}

fn risk_level(ttf: &TimeframeBundle, t: DateTime<Utc>, baseline_window: usize, low: f64, high: f64) -> RiskLevel {
    let bars = ttf.bars();
    let Some(idx) = bars.iter().rposition(|b| b.timestamp <= t) else { return RiskLevel::Medium };
    let series = atr::atr_sma(bars, baseline_window);
    let current_tr = atr::true_range(bars);
    let current = current_tr.get(idx).copied().unwrap_or(f64::NAN);
    let baseline = series.get(idx).copied().unwrap_or(f64::NAN);
    if baseline.is_nan() || baseline <= 0.0 || current.is_nan() {
        return RiskLevel::Medium;
    }
    let ratio = current / baseline;
    if ratio <= low {
        RiskLevel::Low
    } else if ratio <= high {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trendlab_core::config::KernelConfig;
    use trendlab_core::domain::Bar;

    fn rising_bundle(n: usize, interval: Interval) -> TimeframeBundle {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
        let bars: Vec<Bar> = (0..n)
            .map(|i| {
                let price = 100.0 + i as f64 * 1.5;
                Bar {
                    symbol: "SPY".to_string(),
                    interval,
                    timestamp: base + interval.duration() * i as i32,
                    open: price,
                    high: price + 2.0,
                    low: price - 1.0,
                    close: price + 1.0,
                    volume: 1_000.0,
                    is_provisional: false,
                }
            })
            .collect();
        TimeframeBundle::build(bars, &KernelConfig::default())
    }

    #[test]
    fn aligned_uptrends_permit_long() {
        let htf = rising_bundle(10, Interval::H1);
        let ttf = rising_bundle(10, Interval::M5);
        let t = ttf.bars().last().unwrap().timestamp;

        let coordinator = Coordinator::new(CoordinatorConfig::default());
        let record = coordinator
            .analyze("SPY", Interval::H1, &htf, Interval::M5, &ttf, t, false)
            .expect("both bundles have sufficient history");

        assert_eq!(record.alignment_type, AlignmentType::Perfect);
        assert!(record.trade_permitted);
        assert!((0.0..=1.0).contains(&record.signal_strength));
    }

    #[test]
    fn insufficient_history_returns_none() {
        let htf = rising_bundle(1, Interval::H1);
        let ttf = rising_bundle(1, Interval::M5);
        let t = ttf.bars().last().unwrap().timestamp;
        let coordinator = Coordinator::new(CoordinatorConfig::default());
        assert!(coordinator.analyze("SPY", Interval::H1, &htf, Interval::M5, &ttf, t, false).is_none());
    }

    #[test]
    fn repeated_analysis_on_unchanged_bundles_hits_cache() {
        let htf = rising_bundle(10, Interval::H1);
        let ttf = rising_bundle(10, Interval::M5);
        let t = ttf.bars().last().unwrap().timestamp;
        let coordinator = Coordinator::new(CoordinatorConfig::default());
        let first = coordinator.analyze("SPY", Interval::H1, &htf, Interval::M5, &ttf, t, false).unwrap();
        let second = coordinator.analyze("SPY", Interval::H1, &htf, Interval::M5, &ttf, t, false).unwrap();
        assert_eq!(first, second);
    }
}
