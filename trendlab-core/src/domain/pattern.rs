//! Pattern events — the fixed catalog of price patterns (§3, §4.C.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bar::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternType {
    PldotPush,
    PldotRefresh,
    Exhaust,
    CWave,
    CongestionOscillation,
}

/// Opaque metadata value for pattern events and signal pattern_context —
/// a tagged variant so typed consumers don't need to guess shapes, with the
/// JSON-ish map reserved for the persistence boundary only (§9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(f64),
    Text(String),
    Flag(bool),
}

pub type Metadata = BTreeMap<String, MetaValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEvent {
    pub symbol: String,
    pub interval: Interval,
    pub pattern_type: PatternType,
    /// -1 (bearish), 0 (neutral), +1 (bullish).
    pub direction: i8,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub strength: i32,
    pub metadata: Metadata,
}

impl PatternEvent {
    pub fn is_valid(&self) -> bool {
        self.end >= self.start && (-1..=1).contains(&self.direction)
    }
}
