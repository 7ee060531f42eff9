//! Envelope band — the bounded range around a PLdot value (§3, §4.C.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeMethod {
    Atr,
    Percent,
    PldotRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeBand {
    pub symbol: String,
    pub interval: Interval,
    pub timestamp: DateTime<Utc>,
    pub center: f64,
    pub upper: f64,
    pub lower: f64,
    pub method: EnvelopeMethod,
}

impl EnvelopeBand {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn is_valid(&self) -> bool {
        self.lower <= self.center && self.center <= self.upper && self.width() > 0.0
    }
}
