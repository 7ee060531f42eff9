//! TrendLab Core — domain types, Drummond Geometry indicator kernel, bar
//! store, timeframe bundles, and run fingerprinting.
//!
//! This crate contains the pure, I/O-free heart of the system:
//! - Domain types (bars, PLdot, envelope, market state, patterns, signals, runs)
//! - The Indicator Kernel: PLdot, envelope, market-state classifier, pattern detector
//! - The Bar Store: idempotent upsert + on-read aggregation
//! - The Timeframe Bundle: cached per-series indicator output with as-of lookups
//! - Run fingerprinting for reproducible, deduplicated runs

pub mod bundle;
pub mod cache;
pub mod config;
pub mod domain;
pub mod fingerprint;
pub mod indicators;
pub mod store;
