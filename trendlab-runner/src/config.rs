//! Tunable parameters for the runner components (§4.E–§4.H).
//!
//! Mirrors `trendlab_core::config`'s style: every threshold named in the
//! spec is an explicit, documented, overridable field with a `Default`
//! reproducing the spec's stated default.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Price clustering tolerance for confluence zones, as a fraction of the HTF PLdot.
    pub clustering_tolerance_pct: f64,
    /// Lookback window for the ATR baseline behind `risk_level`.
    pub atr_baseline_window: usize,
    /// `risk_level = Low` when TTF ATR / baseline ATR is at or below this.
    pub risk_low_threshold: f64,
    /// `risk_level = High` when TTF ATR / baseline ATR is above this.
    pub risk_high_threshold: f64,
    /// `recommended_action` requires `signal_strength` at or above this.
    pub min_action_signal_strength: f64,
    /// Bundle analysis memoization cache size.
    pub cache_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            clustering_tolerance_pct: 0.005,
            atr_baseline_window: 20,
            risk_low_threshold: 0.8,
            risk_high_threshold: 1.5,
            min_action_signal_strength: 0.5,
            cache_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub min_signal_strength: f64,
    pub min_confidence: f64,
    /// ATR multiplier `k` used for both the stop-loss and target-price legs.
    pub atr_multiplier: f64,
    /// How long a generated signal remains actionable before it expires unexecuted.
    pub signal_ttl_hours: i64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            min_signal_strength: 0.60,
            min_confidence: 0.65,
            atr_multiplier: 2.0,
            signal_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub max_positions: u32,
    pub max_portfolio_risk: f64,
    pub per_trade_risk: f64,
    /// Commission, in basis points of notional, charged on each fill.
    pub commission_bps: f64,
    /// Slippage applied adversely against the trader, in basis points of price, on each fill.
    pub slippage_bps: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            max_positions: 20,
            max_portfolio_risk: 0.10,
            per_trade_risk: 0.02,
            commission_bps: 0.0,
            slippage_bps: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of symbols processed concurrently in one fan-out cycle.
    pub max_concurrency: usize,
    /// Per-symbol retry attempts before that symbol is recorded as failed.
    pub max_retries_per_symbol: u32,
    /// A run is considered stale (and is re-triggered) if the last run is older than this.
    pub freshness_window_minutes: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            max_retries_per_symbol: 2,
            freshness_window_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub coordinator: CoordinatorConfig,
    pub signal: SignalConfig,
    pub backtest: BacktestConfig,
    pub scheduler: SchedulerConfig,
}

/// `ConfigError` refuses to start per §7 — a malformed config file is never
/// silently defaulted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RunnerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_override_from_toml() {
        let toml = r#"
            [coordinator]
            clustering_tolerance_pct = 0.01
            atr_baseline_window = 20
            risk_low_threshold = 0.8
            risk_high_threshold = 1.5
            min_action_signal_strength = 0.5
            cache_capacity = 256

            [signal]
            min_signal_strength = 0.6
            min_confidence = 0.65
            atr_multiplier = 2.0
            signal_ttl_hours = 24

            [backtest]
            initial_capital = 50000.0
            max_positions = 10
            max_portfolio_risk = 0.1
            per_trade_risk = 0.02
            commission_bps = 0.0
            slippage_bps = 2.0

            [scheduler]
            max_concurrency = 4
            max_retries_per_symbol = 2
            freshness_window_minutes = 5
        "#;
        let cfg = RunnerConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.coordinator.clustering_tolerance_pct, 0.01);
        assert_eq!(cfg.backtest.initial_capital, 50_000.0);
    }

    #[test]
    fn malformed_toml_refuses_to_parse() {
        assert!(RunnerConfig::from_toml("not valid toml [[[").is_err());
    }
}
