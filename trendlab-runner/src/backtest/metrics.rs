//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in, scalar
//! out. No dependency on the event loop, persistence, or any other backtest
//! module.

use trendlab_core::domain::{BacktestTrade, PerformanceMetrics};

pub fn compute(equity_curve: &[f64], trades: &[BacktestTrade], initial_capital: f64) -> PerformanceMetrics {
    let trading_days = equity_curve.len();
    PerformanceMetrics {
        total_return: total_return(equity_curve),
        cagr: cagr(equity_curve, trading_days),
        sharpe: sharpe_ratio(equity_curve, 0.0),
        sortino: sortino_ratio(equity_curve, 0.0),
        calmar: calmar_ratio(equity_curve, trading_days),
        max_drawdown: max_drawdown(equity_curve),
        var_95: value_at_risk(equity_curve, 0.95),
        cvar_95: conditional_value_at_risk(equity_curve, 0.95),
        win_rate: win_rate(trades),
        profit_factor: profit_factor(trades),
        trade_count: trades.len(),
        turnover: turnover(trades, initial_capital, trading_days),
        max_consecutive_wins: max_consecutive(trades, true),
        max_consecutive_losses: max_consecutive(trades, false),
        avg_losing_streak: avg_losing_streak(trades),
    }
}

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = *equity_curve.last().unwrap();
    if initial <= 0.0 {
        return 0.0;
    }
    (final_eq - initial) / initial
}

/// Compound Annual Growth Rate. Assumes 252 trading days per year.
pub fn cagr(equity_curve: &[f64], trading_days: usize) -> f64 {
    if equity_curve.len() < 2 || trading_days < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    let final_eq = *equity_curve.last().unwrap();
    if initial <= 0.0 || final_eq <= 0.0 {
        return 0.0;
    }
    let years = trading_days as f64 / 252.0;
    if years <= 0.0 {
        return 0.0;
    }
    (final_eq / initial).powf(1.0 / years) - 1.0
}

/// Annualized Sharpe ratio from daily returns.
pub fn sharpe_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / 252.0;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let mean = mean_f64(&excess);
    let std = std_dev(&excess);
    if std < 1e-15 {
        return 0.0;
    }
    (mean / std) * (252.0_f64).sqrt()
}

/// Annualized Sortino ratio (downside deviation only).
pub fn sortino_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let returns = daily_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_rf = risk_free_rate / 252.0;
    let excess: Vec<f64> = returns.iter().map(|r| r - daily_rf).collect();
    let mean = mean_f64(&excess);

    let downside_sq: Vec<f64> = excess.iter().filter(|&&r| r < 0.0).map(|r| r * r).collect();
    if downside_sq.is_empty() {
        return 0.0;
    }
    let downside_var = downside_sq.iter().sum::<f64>() / returns.len() as f64;
    let downside_std = downside_var.sqrt();
    if downside_std < 1e-15 {
        return 0.0;
    }
    (mean / downside_std) * (252.0_f64).sqrt()
}

/// Calmar ratio: CAGR / |max_drawdown|.
pub fn calmar_ratio(equity_curve: &[f64], trading_days: usize) -> f64 {
    let c = cagr(equity_curve, trading_days);
    let dd = max_drawdown(equity_curve);
    if dd >= 0.0 || c <= 0.0 {
        return 0.0;
    }
    c / dd.abs()
}

/// Maximum drawdown as a negative fraction.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let mut peak = equity_curve[0];
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            let dd = (eq - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

/// Historical Value at Risk at `confidence` (e.g. 0.95), as a negative
/// fraction of daily returns — the loss at the `1 - confidence` percentile.
pub fn value_at_risk(equity_curve: &[f64], confidence: f64) -> f64 {
    let mut returns = daily_returns(equity_curve);
    if returns.is_empty() {
        return 0.0;
    }
    returns.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let idx = (((1.0 - confidence) * returns.len() as f64).floor() as usize).min(returns.len() - 1);
    returns[idx]
}

/// Conditional VaR (expected shortfall): mean of all returns at or below the
/// VaR threshold.
pub fn conditional_value_at_risk(equity_curve: &[f64], confidence: f64) -> f64 {
    let mut returns = daily_returns(equity_curve);
    if returns.is_empty() {
        return 0.0;
    }
    returns.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let cutoff_idx = (((1.0 - confidence) * returns.len() as f64).floor() as usize).min(returns.len() - 1);
    let tail = &returns[..=cutoff_idx];
    mean_f64(tail)
}

pub fn win_rate(trades: &[BacktestTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profits / gross losses, capped at 100.0 for edge cases.
pub fn profit_factor(trades: &[BacktestTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades.iter().filter(|t| t.net_pnl > 0.0).map(|t| t.net_pnl).sum();
    let gross_loss: f64 = trades.iter().filter(|t| t.net_pnl < 0.0).map(|t| t.net_pnl.abs()).sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

/// Annual turnover: total traded notional / average capital / years.
pub fn turnover(trades: &[BacktestTrade], initial_capital: f64, trading_days: usize) -> f64 {
    if trades.is_empty() || initial_capital <= 0.0 || trading_days < 2 {
        return 0.0;
    }
    let total_notional: f64 = trades.iter().map(|t| t.entry_price * t.position_size + t.exit_price * t.position_size).sum();
    let years = trading_days as f64 / 252.0;
    if years <= 0.0 {
        return 0.0;
    }
    total_notional / initial_capital / years
}

pub fn avg_losing_streak(trades: &[BacktestTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let mut streaks = Vec::new();
    let mut current = 0;
    for trade in trades {
        if !trade.is_winner() {
            current += 1;
        } else if current > 0 {
            streaks.push(current);
            current = 0;
        }
    }
    if current > 0 {
        streaks.push(current);
    }
    if streaks.is_empty() {
        return 0.0;
    }
    streaks.iter().sum::<usize>() as f64 / streaks.len() as f64
}

fn max_consecutive(trades: &[BacktestTrade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if trade.is_winner() == winners {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

pub fn daily_returns(equity_curve: &[f64]) -> Vec<f64> {
    if equity_curve.len() < 2 {
        return Vec::new();
    }
    equity_curve.windows(2).map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 }).collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use trendlab_core::domain::TradeType;

    fn trade(net_pnl: f64) -> BacktestTrade {
        let d = Utc.with_ymd_and_hms(2024, 1, 2, 16, 0, 0).unwrap();
        BacktestTrade {
            symbol: "SPY".into(),
            trade_type: TradeType::Long,
            entry_timestamp: d,
            exit_timestamp: d + chrono::Duration::hours(4),
            entry_price: 100.0,
            exit_price: 100.0 + net_pnl / 50.0,
            position_size: 50.0,
            gross_pnl: net_pnl,
            commission: 0.0,
            slippage: 0.0,
            net_pnl,
            signal_id: None,
        }
    }

    #[test]
    fn total_return_on_rising_curve() {
        let curve = vec![100_000.0, 105_000.0, 110_000.0];
        assert!((total_return(&curve) - 0.10).abs() < 1e-9);
    }

    #[test]
    fn max_drawdown_tracks_peak_to_trough() {
        let curve = vec![100.0, 120.0, 90.0, 130.0];
        let dd = max_drawdown(&curve);
        assert!((dd - (-0.25)).abs() < 1e-9);
    }

    #[test]
    fn win_rate_and_profit_factor() {
        let trades = vec![trade(100.0), trade(-50.0), trade(200.0)];
        assert!((win_rate(&trades) - 2.0 / 3.0).abs() < 1e-9);
        assert!((profit_factor(&trades) - (300.0 / 50.0)).abs() < 1e-9);
    }

    #[test]
    fn var_is_more_extreme_or_equal_to_cvar_tail_mean() {
        let curve = vec![100.0, 98.0, 101.0, 95.0, 97.0, 99.0, 90.0, 102.0];
        let var = value_at_risk(&curve, 0.95);
        let cvar = conditional_value_at_risk(&curve, 0.95);
        assert!(cvar <= var + 1e-9);
    }

    #[test]
    fn empty_trades_yield_zeroed_metrics() {
        let metrics = compute(&[], &[], 100_000.0);
        assert_eq!(metrics.trade_count, 0);
        assert_eq!(metrics.win_rate, 0.0);
    }
}
