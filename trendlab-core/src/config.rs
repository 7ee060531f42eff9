//! Tunable parameters for the Indicator Kernel.
//!
//! Per §9's open question, slope/pattern-strength thresholds are source-ambiguous;
//! this struct makes every one of them an explicit, documented, overridable field
//! rather than a buried constant. `Default` reproduces every default named in §4.C.

use serde::{Deserialize, Serialize};

use crate::domain::EnvelopeMethod;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    pub method: EnvelopeMethod,
    /// `atr` mode: lookback for the ATR average.
    pub atr_period: usize,
    /// `atr` mode: width multiplier `k`.
    pub atr_k: f64,
    /// `percent` mode: half-width as a fraction of PLdot.
    pub percent_p: f64,
    /// `pldot_range` mode: lookback window `w` over recent PLdots.
    pub range_window: usize,
    /// `pldot_range` mode: width multiplier `m`.
    pub range_multiplier: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            method: EnvelopeMethod::Atr,
            atr_period: 14,
            atr_k: 2.0,
            percent_p: 0.02,
            range_window: 3,
            range_multiplier: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketStateConfig {
    /// Minimum consecutive same-side bar count `k` to qualify for TREND/CONGESTION_ACTION.
    pub min_run_length: u32,
    /// Horizontal-slope threshold as a fraction of PLdot (`ε`).
    pub slope_epsilon: f64,
}

impl Default for MarketStateConfig {
    fn default() -> Self {
        Self {
            min_run_length: 3,
            slope_epsilon: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternConfig {
    /// PLDOT_PUSH: minimum consecutive bars outside the envelope.
    pub push_min_bars: u32,
    /// PLDOT_REFRESH: minimum prior extension from PLdot, as a fraction.
    pub refresh_extension_pct: f64,
    /// EXHAUST: minimum extension beyond the envelope, as a fraction.
    pub exhaust_extension_pct: f64,
    /// EXHAUST: minimum next-bar reversal, as a fraction.
    pub exhaust_reversal_pct: f64,
    /// C_WAVE: minimum consecutive bars closing at/beyond a moving envelope edge.
    pub cwave_min_bars: u32,
    /// CONGESTION_OSCILLATION: minimum alternating-side bar count.
    pub oscillation_min_bars: u32,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            push_min_bars: 3,
            refresh_extension_pct: 0.02,
            exhaust_extension_pct: 0.04,
            exhaust_reversal_pct: 0.005,
            cwave_min_bars: 3,
            oscillation_min_bars: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// PLdot forward displacement, in bars (default 1).
    pub pldot_displacement: u32,
    pub envelope: EnvelopeConfig,
    pub market_state: MarketStateConfig,
    pub pattern: PatternConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            pldot_displacement: 1,
            envelope: EnvelopeConfig::default(),
            market_state: MarketStateConfig::default(),
            pattern: PatternConfig::default(),
        }
    }
}
