//! Notifier (§6) — exposed contract for delivering generated signals
//! externally. The core awaits no delivery confirmation for correctness;
//! only delivery latency is measured and folded into `notification_ms`.

use std::time::Instant;

use trendlab_core::domain::GeneratedSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, signal: &GeneratedSignal) -> DeliveryOutcome;
}

/// Default notifier when no external channel is configured. Always reports
/// delivery so the scheduler's latency accounting still runs.
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _signal: &GeneratedSignal) -> DeliveryOutcome {
        DeliveryOutcome::Delivered
    }
}

/// Times a notifier call and returns its latency in milliseconds alongside
/// the outcome.
pub fn notify_timed(notifier: &dyn Notifier, signal: &GeneratedSignal) -> (DeliveryOutcome, u64) {
    let start = Instant::now();
    let outcome = notifier.notify(signal);
    (outcome, start.elapsed().as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trendlab_core::domain::{IndicatorSnapshot, PatternContext, RunId, SignalType};

    fn sample_signal() -> GeneratedSignal {
        GeneratedSignal {
            run_id: RunId(0),
            symbol: "SPY".into(),
            signal_timestamp: Utc::now(),
            signal_type: SignalType::Long,
            entry_price: 100.0,
            stop_loss: 98.0,
            target_price: 104.0,
            confidence: 0.8,
            signal_strength: 0.8,
            timeframe_alignment: 1.0,
            risk_reward_ratio: 2.0,
            htf_trend: trendlab_core::domain::TrendDirection::Up,
            trading_tf_state: trendlab_core::domain::StateLabel::Trend,
            confluence_zones_count: 0,
            pattern_context: PatternContext { patterns: vec![], indicators: IndicatorSnapshot { pldot: 99.0, envelope_upper: 101.0, envelope_lower: 97.0, atr: 1.0 } },
            expires_at: Utc::now() + chrono::Duration::hours(24),
            executed: false,
            outcome: None,
        }
    }

    #[test]
    fn noop_notifier_always_delivers() {
        let (outcome, _ms) = notify_timed(&NoopNotifier, &sample_signal());
        assert_eq!(outcome, DeliveryOutcome::Delivered);
    }
}
