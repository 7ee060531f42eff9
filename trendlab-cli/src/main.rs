//! TrendLab CLI — the scheduler control surface (§6): start, stop, status.
//!
//! This binary wires the runner's in-memory persistence and a no-op notifier
//! into a `Scheduler` for local/demo use; a production deployment swaps in
//! the real adapters behind the same trait objects.

use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use trendlab_core::config::KernelConfig;
use trendlab_core::domain::Interval;
use trendlab_runner::config::{CoordinatorConfig, SchedulerConfig, SignalConfig};
use trendlab_runner::coordinator::Coordinator;
use trendlab_runner::notifier::NoopNotifier;
use trendlab_runner::persistence::{InMemoryBarRepository, InMemoryRunRepository, InMemorySchedulerStateStore, InMemorySignalRepository};
use trendlab_runner::scheduler::Scheduler;
use trendlab_runner::signal::SignalGenerator;

#[derive(Parser)]
#[command(name = "trendlab", about = "TrendLab scheduler control surface")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one fan-out cycle over a symbol set and print the resulting run record.
    Start {
        #[arg(long, value_delimiter = ',', default_value = "SPY")]
        symbols: Vec<String>,
        #[arg(long, default_value = "1h")]
        htf: String,
        #[arg(long, default_value = "5m")]
        ttf: String,
    },
    /// Request a graceful stop of the scheduler.
    Stop,
    /// Print the current scheduler state singleton.
    Status,
}

fn parse_interval(s: &str) -> Result<Interval> {
    Ok(match s {
        "1m" => Interval::M1,
        "5m" => Interval::M5,
        "15m" => Interval::M15,
        "30m" => Interval::M30,
        "1h" => Interval::H1,
        "4h" => Interval::H4,
        "1d" => Interval::D1,
        other => bail!("unrecognized interval '{other}' (expected one of 1m,5m,15m,30m,1h,4h,1d)"),
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let scheduler = Scheduler::new(
        SchedulerConfig::default(),
        KernelConfig::default(),
        Coordinator::new(CoordinatorConfig::default()),
        SignalGenerator::new(SignalConfig::default()),
        Arc::new(InMemoryBarRepository::new()),
        Arc::new(InMemoryRunRepository::new()),
        Arc::new(InMemorySignalRepository::new()),
        Arc::new(InMemorySchedulerStateStore::new()),
        Arc::new(NoopNotifier),
    );

    match cli.command {
        Command::Start { symbols, htf, ttf } => {
            let htf_interval = parse_interval(&htf)?;
            let ttf_interval = parse_interval(&ttf)?;
            let run = scheduler.run_once(&symbols, htf_interval, ttf_interval, chrono::Utc::now())?;
            println!("run {} status={:?} processed={}/{} signals={}", run.run_id, run.status, run.symbols_processed, run.symbols_requested, run.signals_generated);
        }
        Command::Stop => {
            scheduler.stop()?;
            println!("scheduler stopped");
        }
        Command::Status => {
            let state = scheduler.status()?;
            println!("status={:?} last_run={:?} current_run={:?}", state.status, state.last_run_timestamp, state.current_run_id);
        }
    }

    Ok(())
}
