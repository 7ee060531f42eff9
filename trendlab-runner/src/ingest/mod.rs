//! Ingestion Reconciler (§4.B): source abstraction, source-class selection,
//! and resilient backfill orchestration.

mod circuit_breaker;
mod rate_limiter;
mod reconcile;
mod source;

pub use circuit_breaker::CircuitBreaker;
pub use rate_limiter::RateLimiter;
pub use reconcile::{BackfillConfig, BackfillStatus, ChunkStatus, Reconciler};
pub use source::{classify_source, BarSource, IngestError, SourceKind};
