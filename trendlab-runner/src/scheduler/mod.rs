//! Scheduler & Runner (§4.H) — cron-driven fan-out over a symbol set with
//! bounded concurrency, invoking the Timeframe Bundle → Coordinator → Signal
//! Generator pipeline per symbol and persisting one run record per cycle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::ThreadPoolBuilder;
use tracing::{info, warn};

use trendlab_core::bundle::TimeframeBundle;
use trendlab_core::config::KernelConfig;
use trendlab_core::domain::{
    GeneratedSignal, Interval, PredictionRun, RunFailure, RunId, RunStatus, SchedulerState, SchedulerStatus, StageLatency,
};

use crate::config::SchedulerConfig;
use crate::coordinator::Coordinator;
use crate::notifier::{notify_timed, Notifier};
use crate::persistence::{BarRepository, PersistenceError, RunRepository, SchedulerStateStore, SignalRepository};
use crate::signal::SignalGenerator;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("a run is already in progress")]
    RunInProgress,
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

struct SymbolOutcome {
    symbol: String,
    signal: Option<GeneratedSignal>,
    error: Option<String>,
    latency: StageLatency,
}

pub struct Scheduler {
    cfg: SchedulerConfig,
    kernel_cfg: KernelConfig,
    coordinator: Coordinator,
    signal_generator: SignalGenerator,
    bar_repo: Arc<dyn BarRepository>,
    run_repo: Arc<dyn RunRepository>,
    signal_repo: Arc<dyn SignalRepository>,
    state_store: Arc<dyn SchedulerStateStore>,
    notifier: Arc<dyn Notifier>,
    next_run_id: AtomicU64,
}

impl Scheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cfg: SchedulerConfig,
        kernel_cfg: KernelConfig,
        coordinator: Coordinator,
        signal_generator: SignalGenerator,
        bar_repo: Arc<dyn BarRepository>,
        run_repo: Arc<dyn RunRepository>,
        signal_repo: Arc<dyn SignalRepository>,
        state_store: Arc<dyn SchedulerStateStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            cfg,
            kernel_cfg,
            coordinator,
            signal_generator,
            bar_repo,
            run_repo,
            signal_repo,
            state_store,
            notifier,
            next_run_id: AtomicU64::new(0),
        }
    }

    /// Run one fan-out cycle over `symbols`. Rejects overlapping runs (§4.H.1).
    pub fn run_once(&self, symbols: &[String], htf_interval: Interval, ttf_interval: Interval, now: DateTime<Utc>) -> Result<PredictionRun, SchedulerError> {
        let mut state = self.state_store.load()?;
        if state.status == SchedulerStatus::Running {
            return Err(SchedulerError::RunInProgress);
        }

        let run_id = RunId(self.next_run_id.fetch_add(1, Ordering::SeqCst));
        state.status = SchedulerStatus::Running;
        state.current_run_id = Some(run_id);
        state.error_message = None;
        self.state_store.store(state.clone())?;

        self.check_freshness(symbols, ttf_interval, now);

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.cfg.max_concurrency.max(1))
            .build()
            .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;

        let outcomes: Vec<SymbolOutcome> = pool.install(|| {
            use rayon::prelude::*;
            symbols.par_iter().map(|symbol| self.process_symbol(run_id, symbol, htf_interval, ttf_interval, now)).collect()
        });

        let mut signals = Vec::new();
        let mut errors = Vec::new();
        let mut succeeded = 0u32;
        let mut total_latency = StageLatency::default();

        for outcome in &outcomes {
            total_latency.data_fetch_ms += outcome.latency.data_fetch_ms;
            total_latency.indicator_calc_ms += outcome.latency.indicator_calc_ms;
            total_latency.signal_generation_ms += outcome.latency.signal_generation_ms;
            match &outcome.error {
                Some(message) => errors.push(RunFailure { symbol: outcome.symbol.clone(), message: message.clone() }),
                None => succeeded += 1,
            }
            if let Some(signal) = &outcome.signal {
                signals.push(signal.clone());
            }
        }

        if !signals.is_empty() {
            self.signal_repo.save_signals(run_id, signals.clone())?;
        }
        for signal in &signals {
            let (outcome, ms) = notify_timed(self.notifier.as_ref(), signal);
            total_latency.notification_ms += ms;
            if outcome == crate::notifier::DeliveryOutcome::Failed {
                warn!(symbol = %signal.symbol, "signal notification delivery failed");
            }
        }

        let status = PredictionRun::status_from_counts(succeeded, errors.len() as u32);
        let run = PredictionRun {
            run_id,
            run_timestamp: now,
            interval_type: ttf_interval,
            symbols_requested: symbols.len() as u32,
            symbols_processed: succeeded,
            signals_generated: signals.len() as u32,
            latency: total_latency,
            status,
            errors,
        };
        self.run_repo.save_run(run.clone())?;

        let mut state = self.state_store.load()?;
        state.status = match status {
            RunStatus::Failed => SchedulerStatus::Error,
            _ => SchedulerStatus::Idle,
        };
        state.last_run_timestamp = Some(now);
        state.current_run_id = None;
        if status == RunStatus::Failed {
            state.error_message = Some("all symbols failed".to_string());
        }
        self.state_store.store(state)?;

        info!(run_id = run.run_id.0, status = ?run.status, signals = run.signals_generated, "scheduler cycle complete");
        Ok(run)
    }

    /// Graceful shutdown: mark the singleton STOPPED. In-flight work is left
    /// to finish up to the caller's own deadline; this call only flips state.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        let mut state = self.state_store.load()?;
        state.status = SchedulerStatus::Stopped;
        state.current_run_id = None;
        self.state_store.store(state)?;
        Ok(())
    }

    pub fn status(&self) -> Result<SchedulerState, SchedulerError> {
        Ok(self.state_store.load()?)
    }

    fn check_freshness(&self, symbols: &[String], ttf_interval: Interval, now: DateTime<Utc>) {
        let threshold = chrono::Duration::minutes(self.cfg.freshness_window_minutes);
        for symbol in symbols {
            if let Ok(Some(bar)) = self.bar_repo.latest_bar(symbol, ttf_interval) {
                if now - bar.timestamp > threshold {
                    warn!(symbol = %symbol, "latest bar older than freshness window, proceeding with available data");
                }
            }
        }
    }

    fn process_symbol(&self, run_id: RunId, symbol: &str, htf_interval: Interval, ttf_interval: Interval, now: DateTime<Utc>) -> SymbolOutcome {
        let mut latency = StageLatency::default();
        let mut last_error = None;

        for attempt in 0..=self.cfg.max_retries_per_symbol {
            let fetch_start = Instant::now();
            let htf_bars = self.bar_repo.load_bars(symbol, htf_interval, DateTime::<Utc>::MIN_UTC, now);
            let ttf_bars = self.bar_repo.load_bars(symbol, ttf_interval, DateTime::<Utc>::MIN_UTC, now);
            latency.data_fetch_ms += fetch_start.elapsed().as_millis() as u64;

            let (htf_bars, ttf_bars) = match (htf_bars, ttf_bars) {
                (Ok(h), Ok(t)) if !h.is_empty() && !t.is_empty() => (h, t),
                (Ok(_), Ok(_)) => {
                    last_error = Some("insufficient bar history".to_string());
                    continue;
                }
                (Err(e), _) | (_, Err(e)) => {
                    last_error = Some(e.to_string());
                    if attempt < self.cfg.max_retries_per_symbol {
                        continue;
                    }
                    break;
                }
            };

            let calc_start = Instant::now();
            let htf_bundle = TimeframeBundle::build(htf_bars, &self.kernel_cfg);
            let ttf_bundle = TimeframeBundle::build(ttf_bars, &self.kernel_cfg);
            let record = self.coordinator.analyze(symbol, htf_interval, &htf_bundle, ttf_interval, &ttf_bundle, now, false);
            latency.indicator_calc_ms += calc_start.elapsed().as_millis() as u64;

            let Some(record) = record else {
                return SymbolOutcome { symbol: symbol.to_string(), signal: None, error: None, latency };
            };

            let sig_start = Instant::now();
            let signal = self.signal_generator.generate(run_id, &record, &ttf_bundle, now, now);
            latency.signal_generation_ms += sig_start.elapsed().as_millis() as u64;

            return SymbolOutcome { symbol: symbol.to_string(), signal, error: None, latency };
        }

        SymbolOutcome { symbol: symbol.to_string(), signal: None, error: last_error, latency }
    }
}
