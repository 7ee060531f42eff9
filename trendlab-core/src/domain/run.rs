//! Prediction run — one row per scheduler fan-out cycle (§3, §4.H).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bar::Interval;
use super::ids::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StageLatency {
    pub data_fetch_ms: u64,
    pub indicator_calc_ms: u64,
    pub signal_generation_ms: u64,
    pub notification_ms: u64,
}

impl StageLatency {
    pub fn total_ms(&self) -> u64 {
        self.data_fetch_ms + self.indicator_calc_ms + self.signal_generation_ms + self.notification_ms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    pub symbol: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRun {
    pub run_id: RunId,
    pub run_timestamp: DateTime<Utc>,
    pub interval_type: Interval,
    pub symbols_requested: u32,
    pub symbols_processed: u32,
    pub signals_generated: u32,
    pub latency: StageLatency,
    pub status: RunStatus,
    pub errors: Vec<RunError>,
}

impl PredictionRun {
    /// Derive run status from per-symbol outcome counts, per §4.H.6.
    pub fn status_from_counts(succeeded: u32, failed: u32) -> RunStatus {
        if failed == 0 {
            RunStatus::Success
        } else if succeeded == 0 {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }
}
