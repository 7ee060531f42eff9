//! TrendLab Runner — ingestion reconciliation, multi-timeframe coordination,
//! signal generation, backtesting, scheduling, and the persistence contracts
//! that tie them to storage.
//!
//! This crate is the I/O-bearing half of the system: `trendlab-core` stays
//! pure and deterministic, and everything here that touches the network, a
//! clock, or a store depends on `trendlab-core` rather than the reverse.

pub mod backtest;
pub mod config;
pub mod coordinator;
pub mod ingest;
pub mod notifier;
pub mod persistence;
pub mod scheduler;
pub mod signal;
