//! Portfolio — aggregate cash + open single-entry positions for the event
//! loop backtester (§4.G).

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use trendlab_core::domain::{BacktestTrade, SignalId, TradeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSide {
    Long,
    Short,
}

#[derive(Debug, Clone)]
pub struct Position {
    pub symbol: String,
    pub side: PositionSide,
    pub shares: f64,
    pub entry_price: f64,
    pub entry_timestamp: DateTime<Utc>,
    pub stop_loss: f64,
    pub target_price: f64,
    pub signal_id: Option<SignalId>,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => self.shares * price,
            PositionSide::Short => self.shares * (2.0 * self.entry_price - price),
        }
    }

    /// Risk per share: distance from entry to stop.
    pub fn risk_per_share(&self) -> f64 {
        (self.entry_price - self.stop_loss).abs()
    }
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub total_commission: f64,
    pub total_slippage: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self { cash: initial_capital, initial_capital, positions: HashMap::new(), total_commission: 0.0, total_slippage: 0.0 }
    }

    pub fn equity(&self, prices: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .map(|p| prices.get(&p.symbol).copied().map(|px| p.market_value(px)).unwrap_or(p.market_value(p.entry_price)))
            .sum();
        self.cash + position_value
    }

    pub fn total_open_risk(&self) -> f64 {
        self.positions.values().map(|p| p.risk_per_share() * p.shares).sum()
    }

    pub fn open(&mut self, position: Position, cost: f64, commission: f64) {
        self.cash -= cost;
        self.total_commission += commission;
        self.positions.insert(position.symbol.clone(), position);
    }

    /// Close the position for `symbol` at `exit_price`, recording commission
    /// and slippage already baked into `exit_price` by the caller. Returns
    /// the completed trade.
    pub fn close(&mut self, symbol: &str, exit_price: f64, exit_timestamp: DateTime<Utc>, commission: f64) -> Option<BacktestTrade> {
        let position = self.positions.remove(symbol)?;
        let gross_pnl = match position.side {
            PositionSide::Long => (exit_price - position.entry_price) * position.shares,
            PositionSide::Short => (position.entry_price - exit_price) * position.shares,
        };
        let proceeds = match position.side {
            PositionSide::Long => exit_price * position.shares,
            PositionSide::Short => (2.0 * position.entry_price - exit_price) * position.shares,
        };
        self.cash += proceeds - commission;
        self.total_commission += commission;

        Some(BacktestTrade {
            symbol: position.symbol,
            trade_type: match position.side {
                PositionSide::Long => TradeType::Long,
                PositionSide::Short => TradeType::Short,
            },
            entry_timestamp: position.entry_timestamp,
            exit_timestamp,
            entry_price: position.entry_price,
            exit_price,
            position_size: position.shares,
            gross_pnl,
            commission,
            slippage: 0.0,
            net_pnl: gross_pnl - commission,
            signal_id: position.signal_id,
        })
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }
}
