//! Indicator Kernel (§4.C) — pure functions over bar sequences. Nothing in
//! this module touches I/O; callers own fetching bars and storing results.

pub mod atr;
pub mod envelope;
pub mod market_state;
pub mod pattern;
pub mod pldot;

#[cfg(test)]
pub mod test_support;

use crate::config::KernelConfig;
use crate::domain::{Bar, EnvelopeBand, MarketState, PatternEvent, PldotPoint};

/// The full output of one kernel pass over a bar sequence: everything the
/// rest of the system reads back out of the Timeframe Bundle.
pub struct KernelOutput {
    pub pldots: Vec<Option<PldotPoint>>,
    pub envelopes: Vec<Option<EnvelopeBand>>,
    pub states: Vec<Option<MarketState>>,
    pub patterns: Vec<PatternEvent>,
}

/// Run the full indicator pipeline over a bar sequence for one
/// `(symbol, interval)` series: PLdot, envelope, market state, then patterns,
/// in that dependency order.
pub fn run(bars: &[Bar], cfg: &KernelConfig) -> KernelOutput {
    let pldots = pldot::compute(bars, cfg.pldot_displacement);
    let envelopes = envelope::compute(bars, &pldots, &cfg.envelope);
    let states = market_state::classify(bars, &pldots, cfg.pldot_displacement, &cfg.market_state);
    let patterns = pattern::detect(bars, &pldots, &envelopes, &states, &cfg.pattern);
    KernelOutput { pldots, envelopes, states, patterns }
}
