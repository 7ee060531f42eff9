//! Generic bounded cache shared by the Timeframe Bundle and the coordinator's
//! confluence-zone memoization (§5).

mod lru;

pub use lru::LruCache;
