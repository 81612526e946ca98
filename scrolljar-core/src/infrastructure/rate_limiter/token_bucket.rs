//! Token Bucket
//!
//! Tokens are added to the bucket at a constant rate up to the burst size,
//! and each admitted request consumes one. An empty bucket rejects without
//! side effects. Time is read from `tokio::time::Instant` so buckets follow
//! a paused test clock.

use super::types::BucketLimits;
use tokio::time::Instant;

/// A single token bucket
#[derive(Debug, Clone)]
pub struct TokenBucket {
    limits: BucketLimits,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket
    pub fn new(limits: BucketLimits, now: Instant) -> Self {
        Self {
            limits,
            tokens: f64::from(limits.burst),
            last_refill: now,
        }
    }

    pub fn limits(&self) -> BucketLimits {
        self.limits
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let added = elapsed.as_secs_f64() * self.limits.rate;
        self.tokens = (self.tokens + added).min(f64::from(self.limits.burst));
        self.last_refill = now;
    }

    /// Consume one token if available
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available
    pub fn remaining(&self) -> u32 {
        self.tokens.max(0.0).floor() as u32
    }

    /// Seconds until one token is available, at least 1
    pub fn retry_after_secs(&self) -> u64 {
        let wait = self.limits.time_for(1.0 - self.tokens);
        wait.as_secs_f64().ceil().max(1.0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_bucket_is_full() {
        let bucket = TokenBucket::new(BucketLimits::new(1.0, 3), Instant::now());
        assert_eq!(bucket.remaining(), 3);
    }

    #[test]
    fn test_empty_bucket_rejects() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(BucketLimits::new(1.0, 2), now);
        assert!(bucket.try_acquire(now));
        assert!(bucket.try_acquire(now));
        assert!(!bucket.try_acquire(now));
        assert_eq!(bucket.remaining(), 0);
        assert_eq!(bucket.retry_after_secs(), 1);
    }

    #[test]
    fn test_refill_is_capped_at_burst() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(BucketLimits::new(10.0, 2), now);
        assert!(bucket.try_acquire(now));
        assert!(bucket.try_acquire(now));

        let later = now + Duration::from_secs(60);
        assert!(bucket.try_acquire(later));
        assert_eq!(bucket.remaining(), 1);
    }

    #[test]
    fn test_partial_refill() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(BucketLimits::new(5.0, 1), now);
        assert!(bucket.try_acquire(now));
        assert!(!bucket.try_acquire(now + Duration::from_millis(100)));
        assert!(bucket.try_acquire(now + Duration::from_millis(200)));
    }
}
