//! Market-state classification — the five-state automaton (§3, §4.C.3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateLabel {
    Trend,
    CongestionEntrance,
    CongestionAction,
    CongestionExit,
    Reversal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlopeTrend {
    Rising,
    Falling,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub symbol: String,
    pub interval: Interval,
    pub timestamp: DateTime<Utc>,
    pub state: StateLabel,
    pub direction: TrendDirection,
    pub bars_in_state: u32,
    pub slope_trend: SlopeTrend,
    pub confidence: f64,
}
