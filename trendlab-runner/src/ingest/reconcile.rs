//! Ingestion Reconciler (§4.B) — source selection, backfill chunking with
//! retry/backoff, and circuit-breaker/rate-limiter gating.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use trendlab_core::domain::{Bar, Interval};

use super::circuit_breaker::CircuitBreaker;
use super::rate_limiter::RateLimiter;
use super::source::{BarSource, IngestError};

#[derive(Debug, Clone, Copy)]
pub struct BackfillConfig {
    /// Width of one backfill request window.
    pub chunk_size: Duration,
    pub max_retries: u32,
    /// Base backoff between retries; attempt `n` sleeps `backoff_base * n`.
    pub backoff_base: StdDuration,
    /// Bars younger than this are still subject to revision and are never
    /// requested by the backfill path — the live/stream path owns them.
    pub finalization_lag: Duration,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            chunk_size: Duration::days(30),
            max_retries: 3,
            backoff_base: StdDuration::from_millis(0),
            finalization_lag: Duration::minutes(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChunkStatus {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub attempts: u32,
    pub succeeded: bool,
    pub bars_fetched: usize,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackfillStatus {
    pub symbol: String,
    pub interval: Interval,
    pub chunks: Vec<ChunkStatus>,
    pub circuit_broke: bool,
}

impl BackfillStatus {
    pub fn total_bars(&self) -> usize {
        self.chunks.iter().map(|c| c.bars_fetched).sum()
    }

    pub fn is_complete(&self) -> bool {
        !self.circuit_broke && self.chunks.iter().all(|c| c.succeeded)
    }
}

pub struct Reconciler {
    circuit_breaker: CircuitBreaker,
    rate_limiter: RateLimiter,
    cfg: BackfillConfig,
}

impl Reconciler {
    pub fn new(cfg: BackfillConfig, max_requests_per_minute: u32) -> Self {
        Self {
            circuit_breaker: CircuitBreaker::default_provider(),
            rate_limiter: RateLimiter::new(max_requests_per_minute),
            cfg,
        }
    }

    /// Backfill `[requested_start, requested_end]`, clamped so nothing inside
    /// the finalization lag is ever requested. Chunks the range, retries each
    /// chunk up to `max_retries` times with linear backoff, and stops the
    /// whole backfill the moment the circuit breaker trips.
    pub fn backfill(
        &self,
        source: &dyn BarSource,
        symbol: &str,
        interval: Interval,
        requested_start: DateTime<Utc>,
        requested_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> (BackfillStatus, Vec<Bar>) {
        // Never request bars still subject to revision, and never request
        // bars inside the last day even if the caller asks for a future-dated
        // range — whichever bound is more restrictive wins.
        let clamp = (now - Duration::days(1)).min(now - self.cfg.finalization_lag);
        let end = requested_end.min(clamp);
        let mut status = BackfillStatus { symbol: symbol.to_string(), interval, chunks: Vec::new(), circuit_broke: false };
        let mut bars = Vec::new();

        if requested_start >= end {
            return (status, bars);
        }

        let mut chunk_start = requested_start;
        while chunk_start < end {
            let chunk_end = (chunk_start + self.cfg.chunk_size).min(end);

            if !self.circuit_breaker.is_allowed() {
                status.circuit_broke = true;
                break;
            }

            let mut attempts = 0;
            let mut result = None;
            while attempts < self.cfg.max_retries.max(1) {
                attempts += 1;
                if !self.rate_limiter.try_acquire() {
                    result = Some(Err(IngestError::RateLimited));
                } else {
                    result = Some(source.fetch(symbol, interval, chunk_start, chunk_end));
                }
                match &result {
                    Some(Ok(_)) => break,
                    _ => {
                        if attempts < self.cfg.max_retries {
                            std::thread::sleep(self.cfg.backoff_base * attempts);
                        }
                    }
                }
            }

            let chunk_status = match result {
                Some(Ok(fetched)) => {
                    self.circuit_breaker.record_success();
                    let n = fetched.len();
                    bars.extend(fetched);
                    ChunkStatus { start: chunk_start, end: chunk_end, attempts, succeeded: true, bars_fetched: n, last_error: None }
                }
                Some(Err(e)) => {
                    self.circuit_breaker.record_failure();
                    ChunkStatus { start: chunk_start, end: chunk_end, attempts, succeeded: false, bars_fetched: 0, last_error: Some(e.to_string()) }
                }
                None => unreachable!("at least one attempt always runs"),
            };
            status.chunks.push(chunk_status);
            chunk_start = chunk_end;
        }

        (status, bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trendlab_core::domain::Interval;

    struct FlakySource {
        fail_first_n_calls: AtomicUsize,
    }

    impl BarSource for FlakySource {
        fn name(&self) -> &str {
            "flaky"
        }
        fn fetch(&self, symbol: &str, interval: Interval, start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<Vec<Bar>, IngestError> {
            if self.fail_first_n_calls.load(Ordering::SeqCst) > 0 {
                self.fail_first_n_calls.fetch_sub(1, Ordering::SeqCst);
                return Err(IngestError::Other("transient".into()));
            }
            Ok(vec![Bar {
                symbol: symbol.to_string(),
                interval,
                timestamp: interval.bucket_start(start),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.5,
                volume: 10.0,
                is_provisional: false,
            }])
        }
    }

    #[test]
    fn backfill_clamps_end_to_one_day_before_now() {
        let cfg = BackfillConfig { chunk_size: Duration::days(5), ..BackfillConfig::default() };
        let reconciler = Reconciler::new(cfg, 1000);
        let source = FlakySource { fail_first_n_calls: AtomicUsize::new(0) };
        let now = Utc::now();
        let requested_start = now - Duration::days(10);
        let requested_end = now; // future-dated relative to the 1-day clamp
        let (status, _bars) = reconciler.backfill(&source, "SPY", Interval::D1, requested_start, requested_end, now);
        assert!(status.chunks.iter().all(|c| c.end <= now - Duration::days(1)));
    }

    #[test]
    fn backfill_clamps_far_future_end_to_exactly_one_day_before_now() {
        // §8 scenario 4: now = 2025-11-13, requested_end = 2025-12-31 must
        // clamp the effective end to 2025-11-12.
        let cfg = BackfillConfig::default();
        let reconciler = Reconciler::new(cfg, 1000);
        let source = FlakySource { fail_first_n_calls: AtomicUsize::new(0) };
        let now = Utc.with_ymd_and_hms(2025, 11, 13, 0, 0, 0).unwrap();
        let requested_start = now - Duration::days(5);
        let requested_end = Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap();
        let (status, _bars) = reconciler.backfill(&source, "SPY", Interval::D1, requested_start, requested_end, now);
        let expected_end = Utc.with_ymd_and_hms(2025, 11, 12, 0, 0, 0).unwrap();
        assert_eq!(status.chunks.last().unwrap().end, expected_end);
    }

    #[test]
    fn backfill_retries_then_succeeds() {
        let cfg = BackfillConfig { chunk_size: Duration::days(30), max_retries: 3, ..BackfillConfig::default() };
        let reconciler = Reconciler::new(cfg, 1000);
        let source = FlakySource { fail_first_n_calls: AtomicUsize::new(2) };
        let now = Utc::now();
        let (status, bars) = reconciler.backfill(&source, "SPY", Interval::D1, now - Duration::days(5), now - Duration::days(1), now);
        assert_eq!(status.chunks.len(), 1);
        assert!(status.chunks[0].succeeded);
        assert_eq!(status.chunks[0].attempts, 3);
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn circuit_breaker_stops_backfill_after_repeated_failures() {
        let cfg = BackfillConfig { chunk_size: Duration::days(1), max_retries: 1, ..BackfillConfig::default() };
        let reconciler = Reconciler::new(cfg, 1000);
        let source = FlakySource { fail_first_n_calls: AtomicUsize::new(100) };
        let now = Utc::now();
        let (status, bars) = reconciler.backfill(&source, "SPY", Interval::D1, now - Duration::days(10), now - Duration::days(1), now);
        assert!(status.circuit_broke);
        assert!(bars.is_empty());
        assert!(status.chunks.len() < 9); // stopped before covering every day
    }

    #[test]
    fn fully_finalized_window_has_no_chunks_when_start_after_clamp() {
        let cfg = BackfillConfig::default();
        let reconciler = Reconciler::new(cfg, 1000);
        let source = FlakySource { fail_first_n_calls: AtomicUsize::new(0) };
        let now = Utc::now();
        let (status, bars) = reconciler.backfill(&source, "SPY", Interval::M5, now, now + Duration::hours(1), now);
        assert!(status.chunks.is_empty());
        assert!(bars.is_empty());
    }
}
