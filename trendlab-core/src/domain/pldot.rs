//! PLdot — the forward-projected average-of-averages level (§3, §4.C.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Interval;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PldotPoint {
    pub symbol: String,
    pub interval: Interval,
    /// The bar-close timestamp this point was projected from.
    pub source_timestamp: DateTime<Utc>,
    /// The timestamp this value is projected onto (source + displacement bars).
    pub projection_timestamp: DateTime<Utc>,
    pub value: f64,
    /// True when `projection_timestamp` is ahead of the bar it was computed from.
    pub is_projected: bool,
}
