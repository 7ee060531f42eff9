//! Ingestion source trait and structured error types (§4.B).

use chrono::{DateTime, Utc};
use thiserror::Error;
use trendlab_core::domain::{Bar, BarError, Interval};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by source")]
    RateLimited,

    #[error("circuit breaker tripped, cooldown has {remaining_secs}s left")]
    CircuitOpen { remaining_secs: u64 },

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error(transparent)]
    InvalidBar(#[from] BarError),

    #[error("source error: {0}")]
    Other(String),
}

/// Which live-ness class a source belongs to, per §4.B's source-selection rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Finalized bars older than the finalization lag — safe to cache permanently.
    Historical,
    /// Bars inside the finalization lag window — may still be revised.
    Live,
    /// The most recent, still-forming bar.
    Stream,
}

/// Abstracts over historical/live/stream data sources so the Reconciler can
/// be tested without a network dependency.
pub trait BarSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, IngestError>;
}

/// Decide which source class a bar's timestamp falls into relative to `now`
/// and the configured `finalization_lag`: bars older than the lag are
/// historical (final), bars within the lag are live (may still revise), and
/// the single most recent open bucket is streamed.
pub fn classify_source(bar_timestamp: DateTime<Utc>, now: DateTime<Utc>, interval: Interval, finalization_lag: chrono::Duration) -> SourceKind {
    let age = now - bar_timestamp;
    if age >= finalization_lag {
        SourceKind::Historical
    } else if age >= interval.duration() {
        SourceKind::Live
    } else {
        SourceKind::Stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn old_bar_is_historical() {
        let now = Utc::now();
        let bar_ts = now - Duration::hours(2);
        assert_eq!(classify_source(bar_ts, now, Interval::M5, Duration::minutes(20)), SourceKind::Historical);
    }

    #[test]
    fn recent_bar_within_lag_is_live() {
        let now = Utc::now();
        let bar_ts = now - Duration::minutes(10);
        assert_eq!(classify_source(bar_ts, now, Interval::M5, Duration::minutes(20)), SourceKind::Live);
    }

    #[test]
    fn current_bucket_is_stream() {
        let now = Utc::now();
        let bar_ts = now - Duration::minutes(1);
        assert_eq!(classify_source(bar_ts, now, Interval::M5, Duration::minutes(20)), SourceKind::Stream);
    }
}
