//! Run fingerprinting — deterministic identification of a backtest or
//! scheduled-run configuration (§9's pluggable-component seams).
//!
//! - `ConfigHash`: structural identity (component types only).
//! - `FullHash`: exact identity (component types + every parameter value).
//! - `RunFingerprint`: the complete record persisted by the Run Repository.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ConfigHash, DatasetHash, FullHash, RunId};

/// Configuration of one pluggable seam (coordinator, signal generator,
/// execution cost model, or persistence adapter).
///
/// `BTreeMap` keeps key order deterministic across serialization, which is
/// what makes `full_hash` reproducible.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentConfig {
    pub component_type: String,
    pub params: BTreeMap<String, f64>,
}

/// The four pluggable seams named in §9's "deep inheritance" redesign flag,
/// bundled into one configuration that fully determines a run's behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyConfig {
    pub coordinator: ComponentConfig,
    pub signal_generator: ComponentConfig,
    pub execution_cost_model: ComponentConfig,
    pub persistence_adapter: ComponentConfig,
}

impl StrategyConfig {
    /// Structural hash: component type names only, ignoring parameter values.
    /// Two runs that only differ by a threshold share a `config_hash` but not
    /// a `full_hash`.
    pub fn config_hash(&self) -> ConfigHash {
        let structural = format!(
            "{}+{}+{}+{}",
            self.coordinator.component_type,
            self.signal_generator.component_type,
            self.execution_cost_model.component_type,
            self.persistence_adapter.component_type,
        );
        ConfigHash::from_bytes(structural.as_bytes())
    }

    /// Full hash: component types and every parameter value.
    pub fn full_hash(&self) -> FullHash {
        let json = serde_json::to_string(self).expect("StrategyConfig must serialize");
        FullHash::from_bytes(json.as_bytes())
    }
}

/// Complete fingerprint of one run, suitable for the Run Repository's
/// dedup/lookup key and for reproducing the run later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub run_id: RunId,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub strategy_config: StrategyConfig,

    pub config_hash: ConfigHash,
    pub full_hash: FullHash,
    pub dataset_hash: DatasetHash,
}

impl RunFingerprint {
    pub fn new(
        run_id: RunId,
        timestamp: DateTime<Utc>,
        symbol: impl Into<String>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        strategy_config: StrategyConfig,
        dataset_hash: DatasetHash,
    ) -> Self {
        let config_hash = strategy_config.config_hash();
        let full_hash = strategy_config.full_hash();
        Self {
            run_id,
            timestamp,
            symbol: symbol.into(),
            window_start,
            window_end,
            strategy_config,
            config_hash,
            full_hash,
            dataset_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> StrategyConfig {
        StrategyConfig {
            coordinator: ComponentConfig {
                component_type: "multi_timeframe".into(),
                params: BTreeMap::from([("alignment_min".into(), 0.6)]),
            },
            signal_generator: ComponentConfig {
                component_type: "pldot_envelope".into(),
                params: BTreeMap::from([("min_confidence".into(), 0.65)]),
            },
            execution_cost_model: ComponentConfig {
                component_type: "fixed_bps".into(),
                params: BTreeMap::from([("commission_bps".into(), 1.0), ("slippage_bps".into(), 2.0)]),
            },
            persistence_adapter: ComponentConfig {
                component_type: "in_memory".into(),
                params: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn config_hash_is_structural_only() {
        let c1 = sample_config();
        let mut c2 = sample_config();
        c2.signal_generator.params.insert("min_confidence".into(), 0.9);

        assert_eq!(c1.config_hash(), c2.config_hash());
        assert_ne!(c1.full_hash(), c2.full_hash());
    }

    #[test]
    fn config_hash_differs_for_different_structure() {
        let c1 = sample_config();
        let mut c2 = sample_config();
        c2.coordinator.component_type = "single_timeframe".into();
        assert_ne!(c1.config_hash(), c2.config_hash());
    }

    #[test]
    fn full_hash_is_deterministic() {
        let config = sample_config();
        assert_eq!(config.full_hash(), config.full_hash());
    }

    #[test]
    fn fingerprint_carries_all_three_hashes() {
        let fp = RunFingerprint::new(
            RunId(1),
            Utc::now(),
            "SPY",
            Utc::now(),
            Utc::now(),
            sample_config(),
            DatasetHash::from_bytes(b"SPY:2024"),
        );
        assert_eq!(fp.config_hash, fp.strategy_config.config_hash());
        assert_eq!(fp.full_hash, fp.strategy_config.full_hash());
    }
}
