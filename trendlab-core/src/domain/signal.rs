//! Generated signal — the Signal Generator's output, immutable once persisted (§3, §4.F).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RunId;
use super::market_state::{StateLabel, TrendDirection};
use super::pattern::PatternEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Long,
    Short,
    ExitLong,
    ExitShort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalOutcome {
    Win,
    Loss,
    Neutral,
    Pending,
}

/// Indicator snapshot carried alongside a signal for downstream review —
/// a tagged struct rather than a free-form map, per §9's dynamic-field guidance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub pldot: f64,
    pub envelope_upper: f64,
    pub envelope_lower: f64,
    pub atr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternContext {
    pub patterns: Vec<PatternEvent>,
    pub indicators: IndicatorSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedOutcome {
    pub outcome: SignalOutcome,
    pub actual_high: f64,
    pub actual_low: f64,
    pub actual_close: f64,
    pub pnl_pct: f64,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSignal {
    pub run_id: RunId,
    pub symbol: String,
    pub signal_timestamp: DateTime<Utc>,
    pub signal_type: SignalType,

    pub entry_price: f64,
    pub stop_loss: f64,
    pub target_price: f64,

    pub confidence: f64,
    pub signal_strength: f64,
    pub timeframe_alignment: f64,
    pub risk_reward_ratio: f64,

    pub htf_trend: TrendDirection,
    pub trading_tf_state: StateLabel,
    pub confluence_zones_count: u32,
    pub pattern_context: PatternContext,

    pub expires_at: DateTime<Utc>,
    pub executed: bool,
    pub outcome: Option<RealizedOutcome>,
}

impl GeneratedSignal {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        !self.executed && now >= self.expires_at
    }
}
