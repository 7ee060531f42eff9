//! Pattern detector (§4.C.4). Scans the aligned bar/PLdot/envelope/state
//! series and emits discrete [`PatternEvent`]s — unlike the other kernel
//! outputs these are not one-per-bar, they are occurrences with a start and
//! an end.

use std::collections::BTreeMap;

use crate::config::PatternConfig;
use crate::domain::{
    Bar, EnvelopeBand, MarketState, MetaValue, PatternEvent, PatternType, PldotPoint, StateLabel,
};

pub fn detect(
    bars: &[Bar],
    pldots: &[Option<PldotPoint>],
    envelopes: &[Option<EnvelopeBand>],
    states: &[Option<MarketState>],
    cfg: &PatternConfig,
) -> Vec<PatternEvent> {
    let mut events = Vec::new();
    events.extend(detect_push(bars, envelopes, states, cfg));
    events.extend(detect_refresh(bars, pldots, envelopes, cfg));
    events.extend(detect_exhaust(bars, envelopes, cfg));
    events.extend(detect_cwave(bars, pldots, cfg));
    events.extend(detect_oscillation(bars, envelopes, states, cfg));
    events
}

fn meta(pairs: &[(&str, MetaValue)]) -> BTreeMap<String, MetaValue> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

/// PLDOT_PUSH: `push_min_bars` consecutive closes beyond the envelope on the
/// side matching an established trend direction — a continuation thrust.
fn detect_push(bars: &[Bar], envelopes: &[Option<EnvelopeBand>], states: &[Option<MarketState>], cfg: &PatternConfig) -> Vec<PatternEvent> {
    let mut out = Vec::new();
    let n = bars.len();
    let min_bars = cfg.push_min_bars.max(1) as usize;
    let mut run_start: Option<usize> = None;
    let mut run_direction: i8 = 0;

    for i in 0..n {
        let pushing = match (&envelopes[i], &states[i]) {
            (Some(env), Some(st)) if st.state == StateLabel::Trend => {
                if bars[i].close > env.upper {
                    Some(1i8)
                } else if bars[i].close < env.lower {
                    Some(-1i8)
                } else {
                    None
                }
            }
            _ => None,
        };

        match pushing {
            Some(dir) if run_start.is_some() && dir == run_direction => {}
            Some(dir) => {
                run_start = Some(i);
                run_direction = dir;
            }
            None => {
                if let Some(start) = run_start.take() {
                    let len = i - start;
                    if len >= min_bars {
                        out.push(make_push_event(bars, envelopes, start, i - 1, run_direction, len));
                    }
                }
            }
        }
    }
    if let Some(start) = run_start {
        let len = n - start;
        if len >= min_bars {
            out.push(make_push_event(bars, envelopes, start, n - 1, run_direction, len));
        }
    }
    out
}

fn make_push_event(
    bars: &[Bar],
    envelopes: &[Option<EnvelopeBand>],
    start: usize,
    end: usize,
    direction: i8,
    len: usize,
) -> PatternEvent {
    let overshoot = envelopes[end]
        .as_ref()
        .map(|e| if direction > 0 { bars[end].close - e.upper } else { e.lower - bars[end].close })
        .unwrap_or(0.0);
    PatternEvent {
        symbol: bars[start].symbol.clone(),
        interval: bars[start].interval,
        pattern_type: PatternType::PldotPush,
        direction,
        start: bars[start].timestamp,
        end: bars[end].timestamp,
        strength: (len as i32).min(10),
        metadata: meta(&[("bars", MetaValue::Number(len as f64)), ("overshoot", MetaValue::Number(overshoot))]),
    }
}

/// PLDOT_REFRESH: price touches the PLdot during a trend, then the very next
/// bar closes back beyond `refresh_extension_pct` of the envelope half-width
/// on the trend side — the trend "refreshed" off its own dot.
fn detect_refresh(bars: &[Bar], pldots: &[Option<PldotPoint>], envelopes: &[Option<EnvelopeBand>], cfg: &PatternConfig) -> Vec<PatternEvent> {
    let mut out = Vec::new();
    let n = bars.len();
    for i in 0..n.saturating_sub(1) {
        let (Some(p), Some(env)) = (&pldots[i], &envelopes[i]) else { continue };
        let touched = bars[i].low <= p.value && bars[i].high >= p.value;
        if !touched {
            continue;
        }
        let half_width = (env.upper - env.lower) / 2.0;
        if half_width <= 0.0 {
            continue;
        }
        let next = &bars[i + 1];
        let threshold = half_width * cfg.refresh_extension_pct;
        if next.close - p.value > threshold {
            out.push(refresh_event(bars, i, i + 1, 1, next.close - p.value));
        } else if p.value - next.close > threshold {
            out.push(refresh_event(bars, i, i + 1, -1, p.value - next.close));
        }
    }
    out
}

fn refresh_event(bars: &[Bar], start: usize, end: usize, direction: i8, extension: f64) -> PatternEvent {
    PatternEvent {
        symbol: bars[start].symbol.clone(),
        interval: bars[start].interval,
        pattern_type: PatternType::PldotRefresh,
        direction,
        start: bars[start].timestamp,
        end: bars[end].timestamp,
        strength: 5,
        metadata: meta(&[("extension", MetaValue::Number(extension))]),
    }
}

/// EXHAUST: a close extends beyond the envelope by more than
/// `exhaust_extension_pct` of its width, then the following bar reverses back
/// through more than `exhaust_reversal_pct` of that same width.
fn detect_exhaust(bars: &[Bar], envelopes: &[Option<EnvelopeBand>], cfg: &PatternConfig) -> Vec<PatternEvent> {
    let mut out = Vec::new();
    let n = bars.len();
    for i in 0..n.saturating_sub(1) {
        let Some(env) = &envelopes[i] else { continue };
        let width = env.upper - env.lower;
        if width <= 0.0 {
            continue;
        }
        let over_upper = (bars[i].close - env.upper) / width;
        let over_lower = (env.lower - bars[i].close) / width;
        let next = &bars[i + 1];

        if over_upper > cfg.exhaust_extension_pct {
            let reversal = (bars[i].close - next.close) / width;
            if reversal > cfg.exhaust_reversal_pct {
                out.push(exhaust_event(bars, i, i + 1, -1, over_upper, reversal));
            }
        } else if over_lower > cfg.exhaust_extension_pct {
            let reversal = (next.close - bars[i].close) / width;
            if reversal > cfg.exhaust_reversal_pct {
                out.push(exhaust_event(bars, i, i + 1, 1, over_lower, reversal));
            }
        }
    }
    out
}

fn exhaust_event(bars: &[Bar], start: usize, end: usize, direction: i8, extension: f64, reversal: f64) -> PatternEvent {
    PatternEvent {
        symbol: bars[start].symbol.clone(),
        interval: bars[start].interval,
        pattern_type: PatternType::Exhaust,
        direction,
        start: bars[start].timestamp,
        end: bars[end].timestamp,
        strength: ((reversal * 10.0) as i32).clamp(1, 10),
        metadata: meta(&[
            ("extension_pct", MetaValue::Number(extension)),
            ("reversal_pct", MetaValue::Number(reversal)),
        ]),
    }
}

/// C_WAVE: the PLdot (the envelope's band center) changes slope sign and
/// holds the new sign for `cwave_min_bars` bars — a congestion wave resolving
/// into a fresh direction. Uses the band center, not raw close, as its slope
/// source.
fn detect_cwave(bars: &[Bar], pldots: &[Option<PldotPoint>], cfg: &PatternConfig) -> Vec<PatternEvent> {
    let mut out = Vec::new();
    let n = bars.len();
    let min_bars = cfg.cwave_min_bars.max(1) as usize;
    let mut run_start: Option<usize> = None;
    let mut run_sign: i8 = 0;

    for i in 1..n {
        let (Some(curr), Some(prev)) = (&pldots[i], &pldots[i - 1]) else {
            if let Some(start) = run_start.take() {
                flush_cwave(bars, &mut out, start, i - 1, run_sign, min_bars);
            }
            continue;
        };
        let delta = curr.value - prev.value;
        let sign = if delta > 0.0 { 1i8 } else if delta < 0.0 { -1i8 } else { 0 };

        if sign != 0 && sign == run_sign {
            continue;
        }
        if let Some(start) = run_start.take() {
            flush_cwave(bars, &mut out, start, i - 1, run_sign, min_bars);
        }
        run_start = Some(i);
        run_sign = sign;
    }
    if let Some(start) = run_start {
        flush_cwave(bars, &mut out, start, n - 1, run_sign, min_bars);
    }
    out
}

fn flush_cwave(bars: &[Bar], out: &mut Vec<PatternEvent>, start: usize, end: usize, sign: i8, min_bars: usize) {
    if sign == 0 || end < start {
        return;
    }
    let len = end - start + 1;
    if len < min_bars {
        return;
    }
    out.push(PatternEvent {
        symbol: bars[start].symbol.clone(),
        interval: bars[start].interval,
        pattern_type: PatternType::CWave,
        direction: sign,
        start: bars[start].timestamp,
        end: bars[end].timestamp,
        strength: (len as i32).min(10),
        metadata: meta(&[("bars", MetaValue::Number(len as f64))]),
    });
}

/// CONGESTION_OSCILLATION: within a congestion state, closes alternate
/// between touching the upper and lower envelope band for at least
/// `oscillation_min_bars` touches.
fn detect_oscillation(
    bars: &[Bar],
    envelopes: &[Option<EnvelopeBand>],
    states: &[Option<MarketState>],
    cfg: &PatternConfig,
) -> Vec<PatternEvent> {
    let mut out = Vec::new();
    let n = bars.len();
    let min_touches = cfg.oscillation_min_bars.max(2) as usize;

    let mut touches: Vec<(usize, i8)> = Vec::new();
    let mut flush = |touches: &mut Vec<(usize, i8)>, out: &mut Vec<PatternEvent>| {
        if touches.len() >= min_touches {
            let start = touches.first().unwrap().0;
            let end = touches.last().unwrap().0;
            out.push(PatternEvent {
                symbol: bars[start].symbol.clone(),
                interval: bars[start].interval,
                pattern_type: PatternType::CongestionOscillation,
                direction: 0,
                start: bars[start].timestamp,
                end: bars[end].timestamp,
                strength: (touches.len() as i32).min(10),
                metadata: meta(&[("touches", MetaValue::Number(touches.len() as f64))]),
            });
        }
        touches.clear();
    };

    for i in 0..n {
        let in_congestion = matches!(
            states[i].as_ref().map(|s| s.state),
            Some(StateLabel::CongestionAction) | Some(StateLabel::CongestionEntrance) | Some(StateLabel::CongestionExit)
        );
        if !in_congestion {
            flush(&mut touches, &mut out);
            continue;
        }
        let Some(env) = &envelopes[i] else {
            flush(&mut touches, &mut out);
            continue;
        };
        let side = if bars[i].high >= env.upper {
            Some(1i8)
        } else if bars[i].low <= env.lower {
            Some(-1i8)
        } else {
            None
        };
        match (side, touches.last()) {
            (Some(s), Some((_, last))) if s == *last => {}
            (Some(s), _) => touches.push((i, s)),
            (None, _) => {}
        }
    }
    flush(&mut touches, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvelopeConfig;
    use crate::indicators::test_support::make_bars;
    use crate::indicators::{envelope, market_state, pldot};

    fn pipeline(bars: &[Bar]) -> (Vec<Option<PldotPoint>>, Vec<Option<EnvelopeBand>>, Vec<Option<MarketState>>) {
        let dots = pldot::compute(bars, 1);
        let env_cfg = EnvelopeConfig {
            method: crate::domain::EnvelopeMethod::Percent,
            ..EnvelopeConfig::default()
        };
        let envs = envelope::compute(bars, &dots, &env_cfg);
        let states = market_state::classify(bars, &dots, 1, &crate::config::MarketStateConfig::default());
        (dots, envs, states)
    }

    #[test]
    fn push_detected_on_sustained_overshoot() {
        let bars = make_bars(&[
            (100.0, 102.0, 98.0, 101.0),
            (101.0, 103.0, 99.0, 102.0),
            (102.0, 104.0, 100.0, 103.0),
            (103.0, 150.0, 101.0, 148.0),
            (148.0, 200.0, 146.0, 198.0),
            (198.0, 250.0, 196.0, 248.0),
        ]);
        let (dots, envs, states) = pipeline(&bars);
        let cfg = PatternConfig {
            push_min_bars: 2,
            ..PatternConfig::default()
        };
        let events = detect(&bars, &dots, &envs, &states, &cfg);
        assert!(events.iter().any(|e| e.pattern_type == PatternType::PldotPush));
    }

    #[test]
    fn no_patterns_on_flat_series() {
        let bars = make_bars(&[
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.5, 99.5, 100.0),
            (100.0, 100.5, 99.5, 100.0),
        ]);
        let (dots, envs, states) = pipeline(&bars);
        let events = detect(&bars, &dots, &envs, &states, &PatternConfig::default());
        assert!(events.iter().all(|e| e.pattern_type != PatternType::PldotPush));
    }

    #[test]
    fn all_events_have_valid_metadata() {
        let bars = make_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
            (101.0, 106.0, 100.0, 105.0),
        ]);
        let (dots, envs, states) = pipeline(&bars);
        let events = detect(&bars, &dots, &envs, &states, &PatternConfig::default());
        for e in events {
            assert!(e.is_valid());
        }
    }
}
