//! Confluence-zone clustering (§4.E.5).
//!
//! Candidates come from PLdot ± envelope edges and recent pattern breakout
//! levels across both bundles. Clustering is a single linear scan over
//! price-sorted candidates rather than the naive O(n²) pairwise comparison:
//! sort once, then join adjacent candidates while the gap stays within
//! tolerance.

use chrono::{DateTime, Utc};

use trendlab_core::bundle::TimeframeBundle;
use trendlab_core::domain::{ConfluenceZone, Interval, PatternType, ZoneCandidate, ZoneType};

const BREAKOUT_LOOKBACK_BARS: i64 = 20;

/// PLdot, envelope edges, and recent push/exhaust breakout levels from one
/// bundle, as of `t`.
pub fn collect_candidates(bundle: &TimeframeBundle, interval: Interval, t: DateTime<Utc>) -> Vec<ZoneCandidate> {
    let mut out = Vec::new();

    if let Some(pldot) = bundle.pldot_at(t) {
        out.push(ZoneCandidate { price: pldot.value, interval, zone_type: ZoneType::Pivot, touched_at: t });
    }
    if let Some(env) = bundle.envelope_at(t) {
        out.push(ZoneCandidate { price: env.upper, interval, zone_type: ZoneType::Resistance, touched_at: t });
        out.push(ZoneCandidate { price: env.lower, interval, zone_type: ZoneType::Support, touched_at: t });
    }

    let lookback_start = t - interval.duration() * BREAKOUT_LOOKBACK_BARS as i32;
    for p in bundle.patterns_in(lookback_start, t) {
        if !matches!(p.pattern_type, PatternType::PldotPush | PatternType::Exhaust) {
            continue;
        }
        let Some(bar) = bundle.bar_at(p.end) else { continue };
        let zone_type = if p.direction > 0 { ZoneType::Resistance } else { ZoneType::Support };
        out.push(ZoneCandidate { price: bar.close, interval, zone_type, touched_at: p.end });
    }

    out
}

/// Cluster price-adjacent candidates into zones. A cluster survives only if
/// it has at least two candidates contributed by at least two distinct
/// timeframes; its `strength` is that distinct-timeframe count.
pub fn cluster_candidates(mut candidates: Vec<ZoneCandidate>, tolerance: f64) -> Vec<ConfluenceZone> {
    candidates.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap());

    let mut zones = Vec::new();
    let mut group: Vec<ZoneCandidate> = Vec::new();

    for c in candidates {
        if let Some(last) = group.last() {
            if (c.price - last.price).abs() > tolerance {
                flush_group(&mut group, &mut zones);
            }
        }
        group.push(c);
    }
    flush_group(&mut group, &mut zones);

    zones
}

fn flush_group(group: &mut Vec<ZoneCandidate>, zones: &mut Vec<ConfluenceZone>) {
    if group.is_empty() {
        return;
    }
    let mut distinct_intervals: Vec<Interval> = group.iter().map(|c| c.interval).collect();
    distinct_intervals.sort_by_key(|i| i.duration());
    distinct_intervals.dedup();

    if group.len() >= 2 && distinct_intervals.len() >= 2 {
        let prices: Vec<f64> = group.iter().map(|c| c.price).collect();
        let center = prices.iter().sum::<f64>() / prices.len() as f64;
        let upper = prices.iter().cloned().fold(f64::MIN, f64::max);
        let lower = prices.iter().cloned().fold(f64::MAX, f64::min);
        let first_touch = group.iter().map(|c| c.touched_at).min().unwrap();
        let last_touch = group.iter().map(|c| c.touched_at).max().unwrap();
        let zone_type = majority_zone_type(group);

        zones.push(ConfluenceZone {
            center,
            upper,
            lower,
            zone_type,
            strength: distinct_intervals.len() as u32,
            timeframes: distinct_intervals.clone(),
            first_touch,
            last_touch,
        });
    }
    group.clear();
}

fn majority_zone_type(group: &[ZoneCandidate]) -> ZoneType {
    let (mut support, mut resistance, mut pivot) = (0, 0, 0);
    for c in group {
        match c.zone_type {
            ZoneType::Support => support += 1,
            ZoneType::Resistance => resistance += 1,
            ZoneType::Pivot => pivot += 1,
        }
    }
    if support >= resistance && support >= pivot {
        ZoneType::Support
    } else if resistance >= pivot {
        ZoneType::Resistance
    } else {
        ZoneType::Pivot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(price: f64, interval: Interval, zone_type: ZoneType) -> ZoneCandidate {
        ZoneCandidate { price, interval, zone_type, touched_at: Utc::now() }
    }

    #[test]
    fn adjacent_candidates_from_two_timeframes_cluster() {
        let candidates = vec![
            candidate(100.00, Interval::M5, ZoneType::Resistance),
            candidate(100.10, Interval::H1, ZoneType::Resistance),
        ];
        let zones = cluster_candidates(candidates, 0.5);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].strength, 2);
    }

    #[test]
    fn single_timeframe_candidates_do_not_form_a_zone() {
        let candidates = vec![
            candidate(100.00, Interval::M5, ZoneType::Resistance),
            candidate(100.10, Interval::M5, ZoneType::Support),
        ];
        let zones = cluster_candidates(candidates, 0.5);
        assert!(zones.is_empty());
    }

    #[test]
    fn far_apart_candidates_stay_in_separate_clusters() {
        let candidates = vec![
            candidate(100.00, Interval::M5, ZoneType::Resistance),
            candidate(100.10, Interval::H1, ZoneType::Resistance),
            candidate(150.00, Interval::M5, ZoneType::Support),
            candidate(150.05, Interval::H1, ZoneType::Support),
        ];
        let zones = cluster_candidates(candidates, 0.5);
        assert_eq!(zones.len(), 2);
    }
}
