//! Rate limiter types and core data structures

use crate::config::RateLimitConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sensitivity class of a route
/// Determines how far the per-client baseline is divided down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteTier {
    /// Reads - full per-client baseline
    General,
    /// Writes - baseline divided by the medium divisor
    Medium,
    /// Identity-sensitive routes - baseline divided by the strict divisor
    Strict,
}

impl RouteTier {
    /// Get the tier name for logging and headers
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteTier::General => "general",
            RouteTier::Medium => "medium",
            RouteTier::Strict => "strict",
        }
    }

    /// Divisor applied to the per-client baseline
    pub fn divisor(&self, config: &RateLimitConfig) -> u32 {
        match self {
            RouteTier::General => 1,
            RouteTier::Medium => config.medium_divisor.max(1),
            RouteTier::Strict => config.strict_divisor.max(1),
        }
    }
}

impl std::fmt::Display for RouteTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which limiter produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Global,
    Client(RouteTier),
}

impl std::fmt::Display for LimitScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitScope::Global => write!(f, "global"),
            LimitScope::Client(tier) => write!(f, "client:{}", tier),
        }
    }
}

/// Effective rate and burst of one bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketLimits {
    /// Tokens added per second
    pub rate: f64,
    /// Bucket capacity
    pub burst: u32,
}

impl BucketLimits {
    pub fn new(rate: f64, burst: u32) -> Self {
        Self { rate, burst }
    }

    /// Limits of the shared global bucket
    pub fn global(config: &RateLimitConfig) -> Self {
        Self::new(config.global_rate, config.global_burst)
    }

    /// Limits of a per-client bucket for the given tier.
    ///
    /// The rate is divided exactly, the burst is divided rounding up so every
    /// tier admits at least one request.
    pub fn for_tier(config: &RateLimitConfig, tier: RouteTier) -> Self {
        let divisor = tier.divisor(config);
        Self::new(
            config.client_rate / f64::from(divisor),
            config.client_burst.div_ceil(divisor).max(1),
        )
    }

    /// Time needed to accumulate `tokens` tokens
    pub fn time_for(&self, tokens: f64) -> Duration {
        if tokens <= 0.0 {
            return Duration::ZERO;
        }
        if self.rate <= 0.0 {
            return Duration::MAX;
        }
        Duration::from_secs_f64(tokens / self.rate)
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Bucket capacity
    pub limit: u32,
    /// Whole tokens left after this decision
    pub remaining: u32,
    /// Retry-After duration in seconds (only set when blocked)
    pub retry_after: Option<u64>,
    /// The limiter that was applied
    pub scope: LimitScope,
}

impl RateLimitResult {
    /// Create a new allowed result
    pub fn allowed(limit: u32, remaining: u32, scope: LimitScope) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            retry_after: None,
            scope,
        }
    }

    /// Create a new blocked result
    pub fn blocked(limit: u32, retry_after: u64, scope: LimitScope) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            retry_after: Some(retry_after),
            scope,
        }
    }

    /// Result returned while rate limiting is switched off
    pub fn unlimited(scope: LimitScope) -> Self {
        Self::allowed(u32::MAX, u32::MAX, scope)
    }
}
