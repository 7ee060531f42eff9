//! Backtester event loop (§4.G) — walk-forward over the union of TTF bar
//! closes across a symbol set, with no lookahead: at tick `t`, every
//! indicator and signal is recomputed from bars with `timestamp <= t` only.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use trendlab_core::bundle::TimeframeBundle;
use trendlab_core::config::KernelConfig;
use trendlab_core::domain::{Bar, BacktestId, BacktestResult, Interval, RunId};

use crate::config::{BacktestConfig, CoordinatorConfig, SignalConfig};
use crate::coordinator::Coordinator;
use crate::signal::SignalGenerator;

use super::metrics;
use super::portfolio::{Position, PositionSide, Portfolio};

pub struct SymbolSeries {
    pub symbol: String,
    pub htf_interval: Interval,
    pub htf_bars: Vec<Bar>,
    pub ttf_interval: Interval,
    pub ttf_bars: Vec<Bar>,
}

pub struct Backtester {
    cfg: BacktestConfig,
    coordinator: Coordinator,
    signal_generator: SignalGenerator,
    kernel_cfg: KernelConfig,
}

struct Candidate {
    symbol: String,
    entry_price: f64,
    stop_loss: f64,
    target_price: f64,
    side: PositionSide,
    confidence: f64,
    signal_strength: f64,
    signal_id: Option<trendlab_core::domain::SignalId>,
    entry_timestamp: DateTime<Utc>,
}

impl Backtester {
    pub fn new(backtest_cfg: BacktestConfig, coordinator_cfg: CoordinatorConfig, signal_cfg: SignalConfig, kernel_cfg: KernelConfig) -> Self {
        Self {
            cfg: backtest_cfg,
            coordinator: Coordinator::new(coordinator_cfg),
            signal_generator: SignalGenerator::new(signal_cfg),
            kernel_cfg,
        }
    }

    pub fn run(&self, run_id: RunId, backtest_id: BacktestId, strategy_name: &str, series: &[SymbolSeries]) -> BacktestResult {
        let mut timestamps: BTreeSet<DateTime<Utc>> = BTreeSet::new();
        for s in series {
            timestamps.extend(s.ttf_bars.iter().map(|b| b.timestamp));
        }

        let mut portfolio = Portfolio::new(self.cfg.initial_capital);
        let mut last_price: HashMap<String, f64> = HashMap::new();
        let mut trades = Vec::new();
        let mut equity_curve = Vec::with_capacity(timestamps.len());

        let start_date = timestamps.iter().next().copied().unwrap_or_else(Utc::now);
        let mut end_date = start_date;

        for &t in &timestamps {
            end_date = t;
            self.manage_exits(&mut portfolio, series, t, &mut last_price, &mut trades);

            let mut candidates = Vec::new();
            for s in series {
                let Some(bar) = s.ttf_bars.iter().find(|b| b.timestamp == t) else { continue };
                last_price.insert(s.symbol.clone(), bar.close);
                if portfolio.has_position(&s.symbol) {
                    continue;
                }
                if let Some(c) = self.candidate_at(run_id, s, t) {
                    candidates.push(c);
                }
            }

            self.admit(&mut portfolio, candidates);
            equity_curve.push(portfolio.equity(&last_price));
        }

        let final_capital = equity_curve.last().copied().unwrap_or(self.cfg.initial_capital);
        let computed_metrics = metrics::compute(&equity_curve, &trades, self.cfg.initial_capital);

        BacktestResult {
            backtest_id,
            strategy_name: strategy_name.to_string(),
            symbol: if series.len() == 1 { Some(series[0].symbol.clone()) } else { None },
            start_date,
            end_date,
            initial_capital: self.cfg.initial_capital,
            final_capital,
            metrics: computed_metrics,
            trades,
        }
    }

    fn candidate_at(&self, run_id: RunId, s: &SymbolSeries, t: DateTime<Utc>) -> Option<Candidate> {
        let htf_slice: Vec<Bar> = s.htf_bars.iter().filter(|b| b.timestamp <= t).cloned().collect();
        let ttf_slice: Vec<Bar> = s.ttf_bars.iter().filter(|b| b.timestamp <= t).cloned().collect();
        if htf_slice.is_empty() || ttf_slice.is_empty() {
            return None;
        }
        let htf_bundle = TimeframeBundle::build(htf_slice, &self.kernel_cfg);
        let ttf_bundle = TimeframeBundle::build(ttf_slice, &self.kernel_cfg);

        let record = self.coordinator.analyze(&s.symbol, s.htf_interval, &htf_bundle, s.ttf_interval, &ttf_bundle, t, false)?;
        let signal = self.signal_generator.generate(run_id, &record, &ttf_bundle, t, t)?;

        let side = match signal.signal_type {
            trendlab_core::domain::SignalType::Long => PositionSide::Long,
            trendlab_core::domain::SignalType::Short => PositionSide::Short,
            _ => return None,
        };

        Some(Candidate {
            symbol: s.symbol.clone(),
            entry_price: signal.entry_price,
            stop_loss: signal.stop_loss,
            target_price: signal.target_price,
            side,
            confidence: signal.confidence,
            signal_strength: signal.signal_strength,
            signal_id: None,
            entry_timestamp: t,
        })
    }

    /// Stop-before-target intrabar rule: if a bar's range contains both the
    /// stop and the target, the stop is assumed to trigger first.
    fn manage_exits(&self, portfolio: &mut Portfolio, series: &[SymbolSeries], t: DateTime<Utc>, last_price: &mut HashMap<String, f64>, trades: &mut Vec<trendlab_core::domain::BacktestTrade>) {
        let symbols_with_positions: Vec<String> = portfolio.positions.keys().cloned().collect();
        for symbol in symbols_with_positions {
            let Some(s) = series.iter().find(|s| s.symbol == symbol) else { continue };
            let Some(bar) = s.ttf_bars.iter().find(|b| b.timestamp == t) else { continue };
            let position = portfolio.positions.get(&symbol).unwrap();

            let (stop_hit, target_hit) = match position.side {
                PositionSide::Long => (bar.low <= position.stop_loss, bar.high >= position.target_price),
                PositionSide::Short => (bar.high >= position.stop_loss, bar.low <= position.target_price),
            };

            let exit_level = if stop_hit {
                Some(position.stop_loss)
            } else if target_hit {
                Some(position.target_price)
            } else {
                None
            };

            if let Some(level) = exit_level {
                let slip = self.cfg.slippage_bps / 10_000.0;
                let exit_price = match position.side {
                    PositionSide::Long => level * (1.0 - slip),
                    PositionSide::Short => level * (1.0 + slip),
                };
                let notional = exit_price * position.shares;
                let commission = notional * (self.cfg.commission_bps / 10_000.0);
                if let Some(trade) = portfolio.close(&symbol, exit_price, t, commission) {
                    last_price.insert(symbol, exit_price);
                    trades.push(trade);
                }
            }
        }
    }

    /// Rank candidates by composite score, then admit until position count,
    /// portfolio risk, or available capital is exhausted.
    fn admit(&self, portfolio: &mut Portfolio, mut candidates: Vec<Candidate>) {
        candidates.sort_by(|a, b| {
            let score_a = a.confidence * a.signal_strength;
            let score_b = b.confidence * b.signal_strength;
            score_b.partial_cmp(&score_a).unwrap().then_with(|| a.symbol.cmp(&b.symbol))
        });

        for c in candidates {
            if portfolio.positions.len() >= self.cfg.max_positions as usize {
                break;
            }
            let prices: HashMap<String, f64> = portfolio.positions.iter().map(|(k, p)| (k.clone(), p.entry_price)).collect();
            let equity = portfolio.equity(&prices).max(1.0);

            let risk_per_trade = equity * self.cfg.per_trade_risk;
            let risk_per_share = (c.entry_price - c.stop_loss).abs();
            if risk_per_share <= f64::EPSILON {
                continue;
            }
            let shares = (risk_per_trade / risk_per_share).floor();
            if shares < 1.0 {
                continue;
            }

            let projected_risk = (portfolio.total_open_risk() + risk_per_share * shares) / equity;
            if projected_risk > self.cfg.max_portfolio_risk {
                continue;
            }

            let slip = self.cfg.slippage_bps / 10_000.0;
            let fill_price = match c.side {
                PositionSide::Long => c.entry_price * (1.0 + slip),
                PositionSide::Short => c.entry_price * (1.0 - slip),
            };
            let notional = fill_price * shares;
            if notional > portfolio.cash {
                continue;
            }
            let commission = notional * (self.cfg.commission_bps / 10_000.0);

            portfolio.open(
                Position {
                    symbol: c.symbol.clone(),
                    side: c.side,
                    shares,
                    entry_price: fill_price,
                    entry_timestamp: c.entry_timestamp,
                    stop_loss: c.stop_loss,
                    target_price: c.target_price,
                    signal_id: c.signal_id,
                },
                notional,
                commission,
            );
        }
    }
}
