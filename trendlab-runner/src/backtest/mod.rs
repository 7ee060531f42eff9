//! Backtester (§4.G) — event-driven walk-forward simulation over historical
//! bars, producing a `BacktestResult` with a realized trade ledger and
//! performance statistics.

mod engine;
mod metrics;
mod portfolio;

pub use engine::{Backtester, SymbolSeries};
pub use portfolio::{Position, PositionSide, Portfolio};

pub mod metrics_fns {
    pub use super::metrics::*;
}
