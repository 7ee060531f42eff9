//! Simple token-bucket rate limiter for ingestion source requests (§4.B).

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct RateLimiter {
    max_tokens: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(max_requests_per_minute: u32) -> Self {
        let max_tokens = max_requests_per_minute.max(1) as f64;
        Self {
            max_tokens,
            refill_per_sec: max_tokens / 60.0,
            bucket: Mutex::new(Bucket { tokens: max_tokens, last_refill: Instant::now() }),
        }
    }

    /// Attempt to consume one token. Returns `false` (and consumes nothing)
    /// if the bucket is empty.
    pub fn try_acquire(&self) -> bool {
        let mut b = self.bucket.lock().unwrap();
        let elapsed = b.last_refill.elapsed().as_secs_f64();
        b.tokens = (b.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        b.last_refill = Instant::now();
        if b.tokens >= 1.0 {
            b.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_capacity_then_blocks() {
        let rl = RateLimiter::new(3);
        assert!(rl.try_acquire());
        assert!(rl.try_acquire());
        assert!(rl.try_acquire());
        assert!(!rl.try_acquire());
    }

    #[test]
    fn refills_over_time() {
        let rl = RateLimiter::new(60); // 1 token/sec
        assert!(rl.try_acquire());
        std::thread::sleep(std::time::Duration::from_millis(1100));
        assert!(rl.try_acquire());
    }
}
