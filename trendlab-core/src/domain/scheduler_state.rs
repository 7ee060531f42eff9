//! Scheduler state singleton (§3, §4.H, §9 — the one intentional process-wide mutable state).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RunId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerStatus {
    Idle,
    Running,
    Stopped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub last_run_timestamp: Option<DateTime<Utc>>,
    pub next_scheduled_run: Option<DateTime<Utc>>,
    pub status: SchedulerStatus,
    pub current_run_id: Option<RunId>,
    pub error_message: Option<String>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self {
            last_run_timestamp: None,
            next_scheduled_run: None,
            status: SchedulerStatus::Idle,
            current_run_id: None,
            error_message: None,
        }
    }
}
