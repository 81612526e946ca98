//! Global rate limiter
//!
//! One shared bucket bounding the total admitted request rate across every
//! client. Consulted first for each request.

use super::token_bucket::TokenBucket;
use super::types::{BucketLimits, LimitScope, RateLimitResult};
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;
use tracing::debug;

pub struct GlobalRateLimiter {
    bucket: Mutex<TokenBucket>,
}

impl GlobalRateLimiter {
    pub fn new(limits: BucketLimits) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(limits, Instant::now())),
        }
    }

    /// Admit one request against the shared bucket
    pub fn admit(&self) -> RateLimitResult {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&self, now: Instant) -> RateLimitResult {
        let mut bucket = self.bucket.lock().unwrap_or_else(PoisonError::into_inner);
        let limit = bucket.limits().burst;

        if bucket.try_acquire(now) {
            RateLimitResult::allowed(limit, bucket.remaining(), LimitScope::Global)
        } else {
            let retry_after = bucket.retry_after_secs();
            debug!(retry_after, "Global rate limit exceeded");
            RateLimitResult::blocked(limit, retry_after, LimitScope::Global)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_global_burst_then_reject() {
        let limiter = GlobalRateLimiter::new(BucketLimits::new(5.0, 5));
        let now = Instant::now();

        for _ in 0..5 {
            assert!(limiter.admit_at(now).allowed);
        }
        let rejected = limiter.admit_at(now);
        assert!(!rejected.allowed);
        assert_eq!(rejected.scope, LimitScope::Global);

        assert!(limiter.admit_at(now + Duration::from_millis(200)).allowed);
        assert!(!limiter.admit_at(now + Duration::from_millis(200)).allowed);
    }
}
