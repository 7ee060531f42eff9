//! Persistence Adapter (§6) — logical storage contracts as traits, with
//! in-memory reference implementations. Physical schema (Postgres, Parquet,
//! whatever) is an adapter concern outside the core; these traits are what
//! the scheduler and backtester depend on.

mod memory;

use chrono::{DateTime, Utc};
use thiserror::Error;

use trendlab_core::domain::{
    AnalysisRecord, Bar, BacktestId, BacktestResult, GeneratedSignal, Interval, PredictionRun, RunId, SchedulerState, SignalId,
};

pub use memory::{InMemoryBacktestRepository, InMemoryBarRepository, InMemoryRunRepository, InMemorySignalRepository, InMemorySchedulerStateStore};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("not found")]
    NotFound,
}

/// `bars` contract (§6): unique on (symbol, interval, timestamp), with
/// `is_provisional` precedence on duplicate timestamps.
pub trait BarRepository: Send + Sync {
    fn upsert_bars(&self, symbol: &str, interval: Interval, bars: Vec<Bar>) -> Result<(), PersistenceError>;
    fn load_bars(&self, symbol: &str, interval: Interval, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Bar>, PersistenceError>;
    fn latest_bar(&self, symbol: &str, interval: Interval) -> Result<Option<Bar>, PersistenceError>;
}

/// `prediction_runs` and `multi_timeframe_analysis` contracts (§6).
pub trait RunRepository: Send + Sync {
    fn save_run(&self, run: PredictionRun) -> Result<(), PersistenceError>;
    fn save_analysis(&self, analysis: AnalysisRecord) -> Result<(), PersistenceError>;
    fn get_run(&self, run_id: RunId) -> Result<Option<PredictionRun>, PersistenceError>;
}

/// `generated_signals` contract (§6). Signal persistence is atomic per
/// run_id, per §5's ordering guarantees.
pub trait SignalRepository: Send + Sync {
    fn save_signals(&self, run_id: RunId, signals: Vec<GeneratedSignal>) -> Result<(), PersistenceError>;
    fn signals_for_run(&self, run_id: RunId) -> Result<Vec<GeneratedSignal>, PersistenceError>;
    fn mark_executed(&self, signal_id: SignalId) -> Result<(), PersistenceError>;
}

/// `backtest_results` / `backtest_trades` contract (§6).
pub trait BacktestRepository: Send + Sync {
    fn save_backtest(&self, result: BacktestResult) -> Result<(), PersistenceError>;
    fn get_backtest(&self, backtest_id: BacktestId) -> Result<Option<BacktestResult>, PersistenceError>;
}

/// `scheduler_state` contract (§6) — a process-wide singleton with exactly
/// one writer (§5).
pub trait SchedulerStateStore: Send + Sync {
    fn load(&self) -> Result<SchedulerState, PersistenceError>;
    fn store(&self, state: SchedulerState) -> Result<(), PersistenceError>;
}
