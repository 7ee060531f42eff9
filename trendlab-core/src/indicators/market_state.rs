//! Market-state classifier — the five-state automaton (§4.C.3).
//!
//! Evaluated bar by bar against the PLdot value whose *projection* lands on
//! that bar (i.e. the PLdot computed `displacement` bars earlier), not the
//! PLdot computed from that bar itself (which would be lookahead).

use crate::config::MarketStateConfig;
use crate::domain::{Bar, MarketState, PldotPoint, SlopeTrend, StateLabel, TrendDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Above,
    Below,
}

fn side_of(close: f64, pldot: f64) -> Side {
    if close >= pldot {
        Side::Above
    } else {
        Side::Below
    }
}

fn classify_slope(prev: f64, curr: f64, pldot: f64, epsilon: f64) -> SlopeTrend {
    let delta = curr - prev;
    if delta.abs() <= epsilon * pldot.abs() {
        SlopeTrend::Horizontal
    } else if delta > 0.0 {
        SlopeTrend::Rising
    } else {
        SlopeTrend::Falling
    }
}

fn slope_strength(prev: f64, curr: f64, pldot: f64) -> f64 {
    if pldot.abs() < f64::EPSILON {
        return 0.0;
    }
    ((curr - prev).abs() / (pldot.abs() * 0.01)).clamp(0.0, 1.0)
}

/// Align the PLdot series so `aligned[i]` is the PLdot value whose
/// `projection_timestamp` lands on bar `i` — i.e. `pldots[i - displacement]`.
fn align_to_bars(pldots: &[Option<PldotPoint>], displacement: u32) -> Vec<Option<f64>> {
    let d = displacement as usize;
    (0..pldots.len())
        .map(|i| i.checked_sub(d).and_then(|j| pldots[j].as_ref()).map(|p| p.value))
        .collect()
}

/// Classify market state bar by bar. Output has the same length as `bars`;
/// entries are `None` until both a side and a slope classification can be
/// computed (needs the aligned PLdot for this bar and the previous one).
pub fn classify(
    bars: &[Bar],
    pldots: &[Option<PldotPoint>],
    displacement: u32,
    cfg: &MarketStateConfig,
) -> Vec<Option<MarketState>> {
    let aligned = align_to_bars(pldots, displacement);
    let n = bars.len();
    let mut out = vec![None; n];

    let mut prev_state = StateLabel::CongestionAction;
    let mut prev_direction = TrendDirection::Neutral;
    let mut prior_trend_direction: Option<TrendDirection> = None;
    let mut last_side: Option<Side> = None;
    let mut run: u32 = 0;

    for i in 0..n {
        let (Some(pldot_i), Some(pldot_prev)) = (aligned[i], i.checked_sub(1).and_then(|j| aligned[j])) else {
            continue;
        };

        let side = side_of(bars[i].close, pldot_i);
        run = match last_side {
            Some(s) if s == side => run + 1,
            _ => 1,
        };
        last_side = Some(side);

        let slope = classify_slope(pldot_prev, pldot_i, pldot_i, cfg.slope_epsilon);
        let strength = slope_strength(pldot_prev, pldot_i, pldot_i);

        let (state, direction, bars_in_state) = transition(
            prev_state,
            prev_direction,
            side,
            run,
            slope,
            prior_trend_direction,
            cfg.min_run_length,
        );

        if let StateLabel::Trend | StateLabel::Reversal = state {
            prior_trend_direction = Some(direction);
        }

        let confidence = (0.5 + 0.3 * (run as f64 / cfg.min_run_length.max(1) as f64).min(1.0) + 0.2 * strength)
            .clamp(0.0, 1.0);

        out[i] = Some(MarketState {
            symbol: bars[i].symbol.clone(),
            interval: bars[i].interval,
            timestamp: bars[i].timestamp,
            state,
            direction,
            bars_in_state,
            slope_trend: slope,
            confidence,
        });

        prev_state = state;
        prev_direction = direction;
    }

    out
}

#[allow(clippy::too_many_arguments)]
fn transition(
    prev_state: StateLabel,
    prev_direction: TrendDirection,
    side: Side,
    k: u32,
    slope: SlopeTrend,
    prior_trend_direction: Option<TrendDirection>,
    min_run_length: u32,
) -> (StateLabel, TrendDirection, u32) {
    // Reversal: prior state was an established trend and the run has now
    // flipped `min_run_length` bars in the opposite direction.
    if prev_state == StateLabel::Trend {
        if prev_direction == TrendDirection::Up && side == Side::Below && k >= min_run_length {
            return (StateLabel::Reversal, TrendDirection::Down, k);
        }
        if prev_direction == TrendDirection::Down && side == Side::Above && k >= min_run_length {
            return (StateLabel::Reversal, TrendDirection::Up, k);
        }
    }

    // A trend already in progress simply continues.
    if prev_state == StateLabel::Trend && k >= min_run_length {
        match (slope, side) {
            (SlopeTrend::Rising, Side::Above) => return (StateLabel::Trend, TrendDirection::Up, k),
            (SlopeTrend::Falling, Side::Below) => return (StateLabel::Trend, TrendDirection::Down, k),
            _ => {}
        }
    }

    // Congestion entrance: leaving a trend for the first bar on the other side.
    if prev_state == StateLabel::Trend
        && k == 1
        && ((prev_direction == TrendDirection::Up && side == Side::Below)
            || (prev_direction == TrendDirection::Down && side == Side::Above))
    {
        return (StateLabel::CongestionEntrance, TrendDirection::Neutral, k);
    }

    // The single bar of congestion-exit always resolves into the resumed
    // trend on the following bar.
    if prev_state == StateLabel::CongestionExit {
        if let Some(pd) = prior_trend_direction {
            return (StateLabel::Trend, pd, k);
        }
    }

    // Still inside congestion with a known prior trend: resumption of that
    // direction for `min_run_length` bars is one bar of congestion-exit,
    // never a direct jump back to TREND.
    if matches!(prev_state, StateLabel::CongestionEntrance | StateLabel::CongestionAction) {
        if let Some(pd) = prior_trend_direction {
            let resumed = (pd == TrendDirection::Up && side == Side::Above) || (pd == TrendDirection::Down && side == Side::Below);
            if resumed && k >= min_run_length {
                return (StateLabel::CongestionExit, pd, k);
            }
            return (StateLabel::CongestionAction, TrendDirection::Neutral, k);
        }
    }

    // No trend established yet (the synthetic initial state): a fresh run
    // long enough and sloped the right way establishes the first trend
    // directly — there is no prior trend to "exit" congestion back into.
    if k >= min_run_length {
        match (slope, side) {
            (SlopeTrend::Rising, Side::Above) => return (StateLabel::Trend, TrendDirection::Up, k),
            (SlopeTrend::Falling, Side::Below) => return (StateLabel::Trend, TrendDirection::Down, k),
            _ => {}
        }
    }

    // Default: too little history, or a horizontal slope, to classify
    // anything more specific.
    (StateLabel::CongestionAction, TrendDirection::Neutral, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::pldot;
    use crate::indicators::test_support::make_bars;

    #[test]
    fn trend_up_then_congestion_entrance_scenario_from_spec() {
        // Three bars closing above a rising PLdot, then a bar closing below.
        let bars = make_bars(&[
            (100.0, 102.0, 98.0, 101.0),
            (101.0, 103.0, 99.0, 102.0),
            (102.0, 104.0, 100.0, 103.0),
            (103.0, 106.0, 101.0, 105.0),
            (105.0, 108.0, 103.0, 107.0),
            (107.0, 110.0, 105.0, 109.0),
            (100.0, 101.0, 95.0, 96.0), // sharp drop: closes below PLdot
        ]);
        let dots = pldot::compute(&bars, 1);
        let cfg = MarketStateConfig::default();
        let states = classify(&bars, &dots, 1, &cfg);

        // Index 5 should show an established uptrend (k>=3, rising slope, above).
        let trend_idx = states[5].as_ref().expect("state at idx 5");
        assert_eq!(trend_idx.state, StateLabel::Trend);
        assert_eq!(trend_idx.direction, TrendDirection::Up);

        // Index 6 (sharp drop) should register congestion entrance or reversal,
        // never silently stay in TREND_UP.
        let after_drop = states[6].as_ref().expect("state at idx 6");
        assert_ne!(after_drop.state, StateLabel::Trend);
    }

    #[test]
    fn confidence_is_within_bounds() {
        let bars = make_bars(&[
            (100.0, 102.0, 98.0, 101.0),
            (101.0, 103.0, 99.0, 102.0),
            (102.0, 104.0, 100.0, 103.0),
            (103.0, 106.0, 101.0, 105.0),
            (105.0, 108.0, 103.0, 107.0),
        ]);
        let dots = pldot::compute(&bars, 1);
        let states = classify(&bars, &dots, 1, &MarketStateConfig::default());
        for s in states.into_iter().flatten() {
            assert!((0.0..=1.0).contains(&s.confidence));
        }
    }

    #[test]
    fn resumption_passes_through_one_bar_of_congestion_exit_before_trend() {
        // Establish the first uptrend.
        let (state, dir, _) = transition(StateLabel::CongestionAction, TrendDirection::Neutral, Side::Above, 3, SlopeTrend::Rising, None, 3);
        assert_eq!((state, dir), (StateLabel::Trend, TrendDirection::Up));

        // Drop below flips into congestion entrance on the very next bar.
        let (state, dir, _) = transition(StateLabel::Trend, TrendDirection::Up, Side::Below, 1, SlopeTrend::Falling, Some(TrendDirection::Up), 3);
        assert_eq!((state, dir), (StateLabel::CongestionEntrance, TrendDirection::Neutral));

        // Still congested while the opposite side's run is short.
        let (state, _, _) = transition(StateLabel::CongestionEntrance, TrendDirection::Neutral, Side::Below, 2, SlopeTrend::Falling, Some(TrendDirection::Up), 3);
        assert_eq!(state, StateLabel::CongestionAction);

        // The up side resumes, but a run of 1-2 bars isn't enough to exit yet.
        let (state, _, _) = transition(StateLabel::CongestionAction, TrendDirection::Neutral, Side::Above, 1, SlopeTrend::Rising, Some(TrendDirection::Up), 3);
        assert_eq!(state, StateLabel::CongestionAction);
        let (state, _, _) = transition(StateLabel::CongestionAction, TrendDirection::Neutral, Side::Above, 2, SlopeTrend::Rising, Some(TrendDirection::Up), 3);
        assert_eq!(state, StateLabel::CongestionAction);

        // Exactly `min_run_length` bars resumed: one bar of congestion-exit,
        // not a direct jump back to TREND.
        let (state, dir, _) = transition(StateLabel::CongestionAction, TrendDirection::Neutral, Side::Above, 3, SlopeTrend::Rising, Some(TrendDirection::Up), 3);
        assert_eq!((state, dir), (StateLabel::CongestionExit, TrendDirection::Up));

        // The bar after congestion-exit resolves into the resumed trend.
        let (state, dir, _) = transition(StateLabel::CongestionExit, TrendDirection::Up, Side::Above, 4, SlopeTrend::Rising, Some(TrendDirection::Up), 3);
        assert_eq!((state, dir), (StateLabel::Trend, TrendDirection::Up));
    }

    #[test]
    fn insufficient_history_defaults_to_congestion_action() {
        let bars = make_bars(&[(100.0, 102.0, 98.0, 101.0), (101.0, 103.0, 99.0, 102.0)]);
        let dots = pldot::compute(&bars, 1);
        let states = classify(&bars, &dots, 1, &MarketStateConfig::default());
        assert!(states.iter().all(|s| s.is_none()));
    }
}
