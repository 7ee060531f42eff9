//! Backtest results — one row per closed trade plus one summary row per run
//! (§3, §4.G, §6 persistence contracts).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BacktestId, SignalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    Long,
    Short,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub symbol: String,
    pub trade_type: TradeType,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_price: f64,
    pub position_size: f64,
    pub gross_pnl: f64,
    pub commission: f64,
    pub slippage: f64,
    pub net_pnl: f64,
    pub signal_id: Option<SignalId>,
}

impl BacktestTrade {
    pub fn return_pct(&self) -> f64 {
        let cost = self.entry_price * self.position_size;
        if cost.abs() < f64::EPSILON {
            return 0.0;
        }
        self.net_pnl / cost
    }

    pub fn duration_hours(&self) -> f64 {
        (self.exit_timestamp - self.entry_timestamp).num_seconds() as f64 / 3600.0
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}

/// Strategy performance statistics computed from an equity curve and the
/// closed-trade list — every field a pure function of those two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub calmar: f64,
    pub max_drawdown: f64,
    /// 95% historical Value at Risk over daily returns, as a negative fraction.
    pub var_95: f64,
    /// 95% historical Conditional VaR (expected shortfall beyond `var_95`).
    pub cvar_95: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    pub turnover: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub avg_losing_streak: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub backtest_id: BacktestId,
    pub strategy_name: String,
    pub symbol: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<BacktestTrade>,
}
