//! In-memory reference implementations of the persistence traits. Useful for
//! tests and for running the scheduler without a real database attached.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use trendlab_core::domain::{
    AnalysisRecord, Bar, BacktestId, BacktestResult, GeneratedSignal, Interval, PredictionRun, RunId, SchedulerState, SignalId,
};

use super::{BacktestRepository, BarRepository, PersistenceError, RunRepository, SchedulerStateStore, SignalRepository};

#[derive(Debug, Default)]
pub struct InMemoryBarRepository {
    bars: Mutex<HashMap<(String, Interval), Vec<Bar>>>,
}

impl InMemoryBarRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BarRepository for InMemoryBarRepository {
    fn upsert_bars(&self, symbol: &str, interval: Interval, new_bars: Vec<Bar>) -> Result<(), PersistenceError> {
        let mut guard = self.bars.lock().map_err(|_| PersistenceError::Unavailable("bar store poisoned".into()))?;
        let entry = guard.entry((symbol.to_string(), interval)).or_default();
        for bar in new_bars {
            match entry.iter().position(|b| b.timestamp == bar.timestamp) {
                // An incoming provisional bar never overwrites a finalized one.
                Some(idx) if entry[idx].is_provisional || !bar.is_provisional => entry[idx] = bar,
                Some(_) => {}
                None => entry.push(bar),
            }
        }
        entry.sort_by_key(|b| b.timestamp);
        Ok(())
    }

    fn load_bars(&self, symbol: &str, interval: Interval, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Bar>, PersistenceError> {
        let guard = self.bars.lock().map_err(|_| PersistenceError::Unavailable("bar store poisoned".into()))?;
        Ok(guard
            .get(&(symbol.to_string(), interval))
            .map(|bars| bars.iter().filter(|b| b.timestamp >= start && b.timestamp <= end).cloned().collect())
            .unwrap_or_default())
    }

    fn latest_bar(&self, symbol: &str, interval: Interval) -> Result<Option<Bar>, PersistenceError> {
        let guard = self.bars.lock().map_err(|_| PersistenceError::Unavailable("bar store poisoned".into()))?;
        Ok(guard.get(&(symbol.to_string(), interval)).and_then(|bars| bars.last().cloned()))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRunRepository {
    runs: Mutex<HashMap<RunId, PredictionRun>>,
    analyses: Mutex<Vec<AnalysisRecord>>,
}

impl InMemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunRepository for InMemoryRunRepository {
    fn save_run(&self, run: PredictionRun) -> Result<(), PersistenceError> {
        let mut guard = self.runs.lock().map_err(|_| PersistenceError::Unavailable("run store poisoned".into()))?;
        guard.insert(run.run_id, run);
        Ok(())
    }

    fn save_analysis(&self, analysis: AnalysisRecord) -> Result<(), PersistenceError> {
        let mut guard = self.analyses.lock().map_err(|_| PersistenceError::Unavailable("analysis store poisoned".into()))?;
        guard.push(analysis);
        Ok(())
    }

    fn get_run(&self, run_id: RunId) -> Result<Option<PredictionRun>, PersistenceError> {
        let guard = self.runs.lock().map_err(|_| PersistenceError::Unavailable("run store poisoned".into()))?;
        Ok(guard.get(&run_id).cloned())
    }
}

#[derive(Debug, Default)]
pub struct InMemorySignalRepository {
    by_run: Mutex<HashMap<RunId, Vec<(SignalId, GeneratedSignal)>>>,
    next_id: Mutex<u64>,
}

impl InMemorySignalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&self) -> Result<SignalId, PersistenceError> {
        let mut next = self.next_id.lock().map_err(|_| PersistenceError::Unavailable("signal store poisoned".into()))?;
        let id = SignalId(*next);
        *next += 1;
        Ok(id)
    }
}

impl SignalRepository for InMemorySignalRepository {
    fn save_signals(&self, run_id: RunId, signals: Vec<GeneratedSignal>) -> Result<(), PersistenceError> {
        let mut tagged = Vec::with_capacity(signals.len());
        for signal in signals {
            tagged.push((self.alloc_id()?, signal));
        }
        let mut guard = self.by_run.lock().map_err(|_| PersistenceError::Unavailable("signal store poisoned".into()))?;
        guard.entry(run_id).or_default().extend(tagged);
        Ok(())
    }

    fn signals_for_run(&self, run_id: RunId) -> Result<Vec<GeneratedSignal>, PersistenceError> {
        let guard = self.by_run.lock().map_err(|_| PersistenceError::Unavailable("signal store poisoned".into()))?;
        Ok(guard.get(&run_id).map(|v| v.iter().map(|(_, s)| s.clone()).collect()).unwrap_or_default())
    }

    fn mark_executed(&self, signal_id: SignalId) -> Result<(), PersistenceError> {
        let mut guard = self.by_run.lock().map_err(|_| PersistenceError::Unavailable("signal store poisoned".into()))?;
        for signals in guard.values_mut() {
            if let Some((_, signal)) = signals.iter_mut().find(|(id, _)| *id == signal_id) {
                signal.executed = true;
                return Ok(());
            }
        }
        Err(PersistenceError::NotFound)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBacktestRepository {
    results: Mutex<HashMap<BacktestId, BacktestResult>>,
}

impl InMemoryBacktestRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BacktestRepository for InMemoryBacktestRepository {
    fn save_backtest(&self, result: BacktestResult) -> Result<(), PersistenceError> {
        let mut guard = self.results.lock().map_err(|_| PersistenceError::Unavailable("backtest store poisoned".into()))?;
        guard.insert(result.backtest_id, result);
        Ok(())
    }

    fn get_backtest(&self, backtest_id: BacktestId) -> Result<Option<BacktestResult>, PersistenceError> {
        let guard = self.results.lock().map_err(|_| PersistenceError::Unavailable("backtest store poisoned".into()))?;
        Ok(guard.get(&backtest_id).cloned())
    }
}

#[derive(Debug)]
pub struct InMemorySchedulerStateStore {
    state: Mutex<SchedulerState>,
}

impl Default for InMemorySchedulerStateStore {
    fn default() -> Self {
        Self { state: Mutex::new(SchedulerState::default()) }
    }
}

impl InMemorySchedulerStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedulerStateStore for InMemorySchedulerStateStore {
    fn load(&self) -> Result<SchedulerState, PersistenceError> {
        let guard = self.state.lock().map_err(|_| PersistenceError::Unavailable("scheduler state poisoned".into()))?;
        Ok(guard.clone())
    }

    fn store(&self, state: SchedulerState) -> Result<(), PersistenceError> {
        let mut guard = self.state.lock().map_err(|_| PersistenceError::Unavailable("scheduler state poisoned".into()))?;
        *guard = state;
        Ok(())
    }
}
