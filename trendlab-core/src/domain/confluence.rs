//! Confluence zones — price bands confirmed by multiple timeframes (§3, §4.E.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneType {
    Support,
    Resistance,
    Pivot,
}

/// A single support/resistance candidate before clustering, e.g. a PLdot ±
/// envelope edge or a recent pattern breakout level from one timeframe.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneCandidate {
    pub price: f64,
    pub interval: Interval,
    pub zone_type: ZoneType,
    pub touched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceZone {
    pub center: f64,
    pub upper: f64,
    pub lower: f64,
    pub zone_type: ZoneType,
    /// Count of distinct timeframes that contributed a candidate to this zone.
    pub strength: u32,
    pub timeframes: Vec<Interval>,
    pub first_touch: DateTime<Utc>,
    pub last_touch: DateTime<Utc>,
}
