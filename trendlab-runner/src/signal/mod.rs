//! Signal Generator (§4.F) — turns a coordinator [`AnalysisRecord`] into a
//! concrete, immutable [`GeneratedSignal`] with entry/stop/target levels.

use chrono::{DateTime, Utc};
use tracing::info;

use trendlab_core::domain::{
    AnalysisRecord, GeneratedSignal, IndicatorSnapshot, PatternContext, RecommendedAction, RunId, SignalType, ZoneType,
};
use trendlab_core::bundle::TimeframeBundle;
use trendlab_core::indicators::atr;

use crate::coordinator::{pattern_strength_term, ttf_slope_strength};
use crate::config::SignalConfig;

pub struct SignalGenerator {
    cfg: SignalConfig,
}

/// Qualitative bucket over a confidence/strength score, per §4.F's descriptor
/// thresholds (0.4 / 0.6 / 0.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthDescriptor {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

pub fn describe_strength(value: f64) -> StrengthDescriptor {
    if value >= 0.8 {
        StrengthDescriptor::VeryStrong
    } else if value >= 0.6 {
        StrengthDescriptor::Strong
    } else if value >= 0.4 {
        StrengthDescriptor::Moderate
    } else {
        StrengthDescriptor::Weak
    }
}

impl SignalGenerator {
    pub fn new(cfg: SignalConfig) -> Self {
        Self { cfg }
    }

    /// Evaluate `record` against a TTF bundle at `t` and emit a signal if it
    /// clears the strength/confidence gates. `now` stamps `expires_at`.
    pub fn generate(&self, run_id: RunId, record: &AnalysisRecord, ttf: &TimeframeBundle, t: DateTime<Utc>, now: DateTime<Utc>) -> Option<GeneratedSignal> {
        let direction = match record.recommended_action {
            RecommendedAction::Long => 1,
            RecommendedAction::Short => -1,
            RecommendedAction::Wait | RecommendedAction::Reduce => return None,
        };
        if record.signal_strength < self.cfg.min_signal_strength {
            return None;
        }

        let confidence = self.confidence(record, ttf, t);
        if confidence < self.cfg.min_confidence {
            return None;
        }

        let bar = ttf.bar_at(t)?;
        let envelope = ttf.envelope_at(t)?;
        let pldot = ttf.pldot_at(t)?;
        let atr_value = atr::atr_sma(ttf.bars(), 14).get(bundle_index(ttf, t)?).copied().unwrap_or(f64::NAN);
        if atr_value.is_nan() {
            return None;
        }

        let entry_price = bar.close;
        let k = self.cfg.atr_multiplier;

        let (stop_loss, target_price) = if direction > 0 {
            let stop = [entry_price - k * atr_value, pldot.value, envelope.lower]
                .into_iter()
                .fold(f64::INFINITY, f64::min);
            let resistance = nearest_zone_center(record, entry_price, ZoneType::Resistance, true);
            let target = [entry_price + k * atr_value]
                .into_iter()
                .chain(resistance)
                .fold(f64::NEG_INFINITY, f64::max);
            (stop, target)
        } else {
            let stop = [entry_price + k * atr_value, pldot.value, envelope.upper]
                .into_iter()
                .fold(f64::NEG_INFINITY, f64::max);
            let support = nearest_zone_center(record, entry_price, ZoneType::Support, false);
            let target = [entry_price - k * atr_value]
                .into_iter()
                .chain(support)
                .fold(f64::INFINITY, f64::min);
            (stop, target)
        };

        let risk = (entry_price - stop_loss).abs();
        if risk <= f64::EPSILON {
            return None;
        }
        let risk_reward_ratio = (target_price - entry_price).abs() / risk;

        let window_start = t - record.ttf.duration() * 5;
        let patterns = ttf.patterns_in(window_start, t).into_iter().cloned().collect();
        let pattern_context = PatternContext {
            patterns,
            indicators: IndicatorSnapshot { pldot: pldot.value, envelope_upper: envelope.upper, envelope_lower: envelope.lower, atr: atr_value },
        };

        let signal_type = if direction > 0 { SignalType::Long } else { SignalType::Short };
        let descriptor = describe_strength(confidence);
        info!(symbol = %record.symbol, confidence, ?descriptor, "signal emitted");

        Some(GeneratedSignal {
            run_id,
            symbol: record.symbol.clone(),
            signal_timestamp: t,
            signal_type,
            entry_price,
            stop_loss,
            target_price,
            confidence,
            signal_strength: record.signal_strength,
            timeframe_alignment: record.alignment_score,
            risk_reward_ratio,
            htf_trend: record.htf_trend,
            trading_tf_state: ttf.state_at(t)?.state,
            confluence_zones_count: record.confluence_zones.len() as u32,
            pattern_context,
            expires_at: t + chrono::Duration::hours(self.cfg.signal_ttl_hours),
            executed: false,
            outcome: None,
        })
    }

    fn confidence(&self, record: &AnalysisRecord, ttf: &TimeframeBundle, t: DateTime<Utc>) -> f64 {
        let alignment_term = record.alignment_score;
        let pldot_strength_term = ttf_slope_strength(ttf, t);
        let cwave_term = pattern_strength_term(ttf, t, record.ttf);
        let lines_term = (record.confluence_zones.iter().map(|z| z.strength).max().unwrap_or(0) as f64 / 3.0).min(1.0);
        let historical_term = 0.5;

        0.30 * alignment_term + 0.25 * pldot_strength_term + 0.20 * cwave_term + 0.15 * lines_term + 0.10 * historical_term
    }
}

fn bundle_index(bundle: &TimeframeBundle, t: DateTime<Utc>) -> Option<usize> {
    bundle.bars().iter().rposition(|b| b.timestamp <= t)
}

/// Nearest confluence-zone center on the correct side of `entry` for a
/// target level: above entry for a long's resistance target, below entry for
/// a short's support target.
fn nearest_zone_center(record: &AnalysisRecord, entry: f64, zone_type: ZoneType, above: bool) -> Option<f64> {
    record
        .confluence_zones
        .iter()
        .filter(|z| z.zone_type == zone_type || z.zone_type == ZoneType::Pivot)
        .filter(|z| if above { z.center > entry } else { z.center < entry })
        .min_by(|a, b| (a.center - entry).abs().partial_cmp(&(b.center - entry).abs()).unwrap())
        .map(|z| z.center)
}
