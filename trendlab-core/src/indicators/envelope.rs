//! Envelope band calculator (§4.C.2). Three interchangeable sizing modes.

use crate::config::EnvelopeConfig;
use crate::domain::{Bar, EnvelopeBand, EnvelopeMethod, PldotPoint};
use crate::indicators::atr::atr_sma;

/// Compute the envelope series aligned to the PLdot series (same length,
/// `None` wherever the PLdot is `None` or there isn't enough history for the
/// selected sizing mode).
pub fn compute(bars: &[Bar], pldots: &[Option<PldotPoint>], cfg: &EnvelopeConfig) -> Vec<Option<EnvelopeBand>> {
    match cfg.method {
        EnvelopeMethod::Atr => compute_atr(bars, pldots, cfg),
        EnvelopeMethod::Percent => compute_percent(pldots, cfg),
        EnvelopeMethod::PldotRange => compute_pldot_range(pldots, cfg),
    }
}

fn band(bars: &[Bar], pldots: &[Option<PldotPoint>], i: usize, center: f64, half_width: f64) -> Option<EnvelopeBand> {
    if half_width <= 0.0 {
        return None;
    }
    let p = pldots[i].as_ref()?;
    Some(EnvelopeBand {
        symbol: bars[i].symbol.clone(),
        interval: bars[i].interval,
        timestamp: p.source_timestamp,
        center,
        upper: center + half_width,
        lower: center - half_width,
        method: EnvelopeMethod::Atr,
    })
}

fn compute_atr(bars: &[Bar], pldots: &[Option<PldotPoint>], cfg: &EnvelopeConfig) -> Vec<Option<EnvelopeBand>> {
    let atr = atr_sma(bars, cfg.atr_period);
    (0..bars.len())
        .map(|i| {
            if atr[i].is_nan() {
                return None;
            }
            pldots[i].as_ref().and_then(|p| {
                let mut b = band(bars, pldots, i, p.value, cfg.atr_k * atr[i])?;
                b.method = EnvelopeMethod::Atr;
                Some(b)
            })
        })
        .collect()
}

fn compute_percent(pldots: &[Option<PldotPoint>], cfg: &EnvelopeConfig) -> Vec<Option<EnvelopeBand>> {
    pldots
        .iter()
        .map(|maybe_p| {
            maybe_p.as_ref().map(|p| EnvelopeBand {
                symbol: p.symbol.clone(),
                interval: p.interval,
                timestamp: p.source_timestamp,
                center: p.value,
                upper: p.value * (1.0 + cfg.percent_p),
                lower: p.value * (1.0 - cfg.percent_p),
                method: EnvelopeMethod::Percent,
            })
        })
        .collect()
}

fn compute_pldot_range(pldots: &[Option<PldotPoint>], cfg: &EnvelopeConfig) -> Vec<Option<EnvelopeBand>> {
    let w = cfg.range_window.max(1);
    (0..pldots.len())
        .map(|i| {
            let p = pldots[i].as_ref()?;
            let window_start = i.checked_sub(w.saturating_sub(1))?;
            let window: Vec<f64> = pldots[window_start..=i]
                .iter()
                .filter_map(|x| x.as_ref().map(|p| p.value))
                .collect();
            if window.len() < w {
                return None;
            }
            let max = window.iter().cloned().fold(f64::MIN, f64::max);
            let min = window.iter().cloned().fold(f64::MAX, f64::min);
            let width = (max - min) * cfg.range_multiplier;
            if width <= 0.0 {
                return None;
            }
            Some(EnvelopeBand {
                symbol: p.symbol.clone(),
                interval: p.interval,
                timestamp: p.source_timestamp,
                center: p.value,
                upper: p.value + width / 2.0,
                lower: p.value - width / 2.0,
                method: EnvelopeMethod::PldotRange,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::pldot;
    use crate::indicators::test_support::{assert_approx, make_bars, DEFAULT_EPSILON};

    fn trending_bars() -> Vec<Bar> {
        make_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
            (99.0, 103.0, 97.0, 101.0),
            (101.0, 106.0, 100.0, 105.0),
            (105.0, 110.0, 103.0, 108.0),
            (108.0, 112.0, 104.0, 110.0),
            (110.0, 115.0, 107.0, 113.0),
            (113.0, 118.0, 110.0, 116.0),
            (116.0, 120.0, 112.0, 118.0),
        ])
    }

    #[test]
    fn atr_envelope_is_valid_and_centered() {
        let bars = trending_bars();
        let dots = pldot::compute(&bars, 1);
        let cfg = EnvelopeConfig {
            atr_period: 3,
            ..EnvelopeConfig::default()
        };
        let bands = compute(&bars, &dots, &cfg);
        let last = bands.last().unwrap().as_ref().unwrap();
        assert!(last.is_valid());
        assert_approx(last.center, dots.last().unwrap().as_ref().unwrap().value, DEFAULT_EPSILON);
    }

    #[test]
    fn percent_envelope_default_two_percent() {
        let bars = trending_bars();
        let dots = pldot::compute(&bars, 1);
        let cfg = EnvelopeConfig {
            method: EnvelopeMethod::Percent,
            ..EnvelopeConfig::default()
        };
        let bands = compute(&bars, &dots, &cfg);
        let i = bands.iter().position(|b| b.is_some()).unwrap();
        let b = bands[i].as_ref().unwrap();
        let p = dots[i].as_ref().unwrap().value;
        assert_approx(b.upper, p * 1.02, DEFAULT_EPSILON);
        assert_approx(b.lower, p * 0.98, DEFAULT_EPSILON);
    }

    #[test]
    fn pldot_range_envelope_uses_window() {
        let bars = trending_bars();
        let dots = pldot::compute(&bars, 1);
        let cfg = EnvelopeConfig {
            method: EnvelopeMethod::PldotRange,
            range_window: 3,
            range_multiplier: 1.0,
            ..EnvelopeConfig::default()
        };
        let bands = compute(&bars, &dots, &cfg);
        let last = bands.last().unwrap().as_ref().unwrap();
        assert!(last.is_valid());
    }
}
