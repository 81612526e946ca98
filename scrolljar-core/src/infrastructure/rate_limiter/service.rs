//! Rate Limiter Service
//!
//! Coordinates the two limiter levels used by the HTTP layer:
//! - a shared global bucket consulted first for every request
//! - per-client buckets keyed by remote address and route tier
//!
//! The service owns the idle sweep as a cancellable background task.

use super::client::ClientRateLimiter;
use super::global::GlobalRateLimiter;
use super::types::{BucketLimits, LimitScope, RateLimitResult, RouteTier};
use crate::config::RateLimitConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Main rate limiter service
pub struct RateLimiterService {
    global: GlobalRateLimiter,
    clients: ClientRateLimiter,
    config: RateLimitConfig,
}

impl RateLimiterService {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            global: GlobalRateLimiter::new(BucketLimits::global(&config)),
            clients: ClientRateLimiter::new(&config),
            config,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Admit a request against the global bucket
    pub fn check_global(&self) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::unlimited(LimitScope::Global);
        }
        self.global.admit()
    }

    /// Admit a request from `address` against the bucket of the route tier
    pub fn check_client(&self, address: &str, tier: RouteTier) -> RateLimitResult {
        if !self.config.enabled {
            return RateLimitResult::unlimited(LimitScope::Client(tier));
        }
        self.clients.admit(address, tier)
    }

    /// Run one sweep of the client bucket map
    pub fn sweep(&self) -> usize {
        self.clients.sweep(Instant::now())
    }

    /// Start the periodic idle sweep.
    ///
    /// The task stops when `parent` is cancelled or when the returned handle is
    /// stopped, whichever comes first.
    pub fn start_sweeper(self: &Arc<Self>, parent: &CancellationToken) -> SweeperHandle {
        let token = parent.child_token();
        let period = self.config.sweep_interval();
        let service = Arc::clone(self);
        let cancel = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Rate limiter sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let evicted = service.sweep();
                        if evicted > 0 {
                            debug!(evicted, remaining = service.clients.len(), "Evicted idle client buckets");
                        }
                    }
                }
            }
        });

        info!(
            interval_secs = period.as_secs(),
            idle_secs = self.config.idle_eviction_seconds,
            "Rate limiter sweeper started"
        );

        SweeperHandle { token, handle }
    }

    /// Client limiter, exposed for inspection
    pub fn clients(&self) -> &ClientRateLimiter {
        &self.clients
    }

    /// Get the configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }
}

/// Owner handle of the running sweep task
pub struct SweeperHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the sweeper without waiting for it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the sweeper and wait for it to exit
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!("Rate limiter sweeper terminated abnormally: {}", e);
        }
    }
}
