//! Per-client tiered rate limiter
//!
//! Each (address, tier) pair owns an independent bucket created on first use.
//! Lookup, creation, refresh of `last_seen` and the idle sweep all take the
//! same lock, so a sweep can never drop a bucket a concurrent request is
//! about to reuse. Nothing inside the lock performs I/O.

use super::token_bucket::TokenBucket;
use super::types::{BucketLimits, LimitScope, RateLimitResult, RouteTier};
use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    address: String,
    tier: RouteTier,
}

#[derive(Debug)]
struct ClientBucket {
    bucket: TokenBucket,
    last_seen: Instant,
}

pub struct ClientRateLimiter {
    buckets: Mutex<HashMap<ClientKey, ClientBucket>>,
    general: BucketLimits,
    medium: BucketLimits,
    strict: BucketLimits,
    idle_window: Duration,
}

impl ClientRateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            general: BucketLimits::for_tier(config, RouteTier::General),
            medium: BucketLimits::for_tier(config, RouteTier::Medium),
            strict: BucketLimits::for_tier(config, RouteTier::Strict),
            idle_window: config.idle_eviction(),
        }
    }

    pub fn limits_for(&self, tier: RouteTier) -> BucketLimits {
        match tier {
            RouteTier::General => self.general,
            RouteTier::Medium => self.medium,
            RouteTier::Strict => self.strict,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ClientKey, ClientBucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit one request from `address` on a route of the given tier
    pub fn admit(&self, address: &str, tier: RouteTier) -> RateLimitResult {
        self.admit_at(address, tier, Instant::now())
    }

    pub fn admit_at(&self, address: &str, tier: RouteTier, now: Instant) -> RateLimitResult {
        let limits = self.limits_for(tier);
        let scope = LimitScope::Client(tier);
        let key = ClientKey {
            address: address.to_string(),
            tier,
        };

        let mut buckets = self.lock();
        let entry = buckets.entry(key).or_insert_with(|| ClientBucket {
            bucket: TokenBucket::new(limits, now),
            last_seen: now,
        });
        entry.last_seen = now;

        if entry.bucket.try_acquire(now) {
            RateLimitResult::allowed(limits.burst, entry.bucket.remaining(), scope)
        } else {
            let retry_after = entry.bucket.retry_after_secs();
            debug!(ip = %address, tier = %tier, retry_after, "Client rate limit exceeded");
            RateLimitResult::blocked(limits.burst, retry_after, scope)
        }
    }

    /// Evict buckets idle for longer than the eviction window.
    ///
    /// Returns the number of evicted buckets.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut buckets = self.lock();
        let before = buckets.len();
        buckets.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.idle_window);
        before - buckets.len()
    }

    /// Number of live buckets
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Whether a bucket currently exists for the pair
    pub fn contains(&self, address: &str, tier: RouteTier) -> bool {
        self.lock().contains_key(&ClientKey {
            address: address.to_string(),
            tier,
        })
    }
}
