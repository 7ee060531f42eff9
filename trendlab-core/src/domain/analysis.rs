//! Analysis record — the Multi-Timeframe Coordinator's output (§3, §4.E).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Interval;
use super::confluence::ConfluenceZone;
use super::market_state::TrendDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentType {
    Perfect,
    Partial,
    Divergent,
    Conflicting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedAction {
    Long,
    Short,
    Wait,
    Reduce,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub symbol: String,
    pub htf: Interval,
    pub ttf: Interval,
    pub timestamp: DateTime<Utc>,

    pub htf_trend: TrendDirection,
    pub trading_tf_trend: TrendDirection,
    pub alignment_score: f64,
    pub alignment_type: AlignmentType,
    pub trade_permitted: bool,

    pub htf_pldot: f64,
    pub ttf_pldot: f64,
    pub pldot_distance_percent: f64,

    pub signal_strength: f64,
    pub risk_level: RiskLevel,
    pub recommended_action: RecommendedAction,

    pub pattern_confluence: bool,
    pub confluence_zones: Vec<ConfluenceZone>,
}
