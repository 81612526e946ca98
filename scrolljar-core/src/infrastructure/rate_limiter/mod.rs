//! Rate Limiting Infrastructure
//!
//! This module provides the two-level admission system:
//! - A shared global token bucket bounding aggregate traffic
//! - Per-client token buckets keyed by remote address and route tier
//! - A cancellable sweep evicting idle client buckets

pub mod client;
pub mod global;
pub mod service;
pub mod token_bucket;
pub mod types;

pub use service::{RateLimiterService, SweeperHandle};
pub use types::{BucketLimits, LimitScope, RateLimitResult, RouteTier};
