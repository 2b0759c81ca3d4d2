//! Sliding-log rate limiting keyed by remote address.

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chat_core::{ChatError, ChatRequest, Method, Middleware, Result};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::RATE_LIMIT_REJECTION;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per address within one window.
    pub max_requests: usize,
    pub window: Duration,
    /// Number of tracked addresses above which idle ones are evicted on the next check.
    pub evict_after_keys: usize,
}

impl RateLimitConfig {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            evict_after_keys: 1024,
        }
    }

    pub fn with_evict_after_keys(mut self, evict_after_keys: usize) -> Self {
        self.evict_after_keys = evict_after_keys;
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::new(5, Duration::seconds(60))
    }
}

/// Per-address request logs behind one lock. Each log is kept sorted oldest first.
pub struct RateLimitStore {
    config: RateLimitConfig,
    logs: Mutex<HashMap<IpAddr, VecDeque<DateTime<Utc>>>>,
}

impl RateLimitStore {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            logs: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Prunes `addr`'s log to the window ending at `now`, then records `now` if the address is
    /// still under its budget. Returns whether the request is allowed.
    pub async fn check_and_record(&self, addr: IpAddr, now: DateTime<Utc>) -> bool {
        let mut logs = self.logs.lock().await;

        if logs.len() > self.config.evict_after_keys {
            let evicted = evict_idle_locked(&mut logs, now, self.config.window);
            debug!(evicted, tracked = logs.len(), "Evicted idle rate limit keys");
        }

        let log = logs.entry(addr).or_default();
        while log
            .front()
            .is_some_and(|oldest| now - *oldest >= self.config.window)
        {
            log.pop_front();
        }

        if log.len() >= self.config.max_requests {
            return false;
        }
        // Requests are stamped before the lock is taken, so `now` may be older than the tail.
        let position = log.partition_point(|recorded| *recorded <= now);
        log.insert(position, now);
        true
    }

    /// Drops every address whose newest entry has left the window. Returns how many were dropped.
    pub async fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut logs = self.logs.lock().await;
        let evicted = evict_idle_locked(&mut logs, now, self.config.window);
        if evicted > 0 {
            info!(evicted, tracked = logs.len(), "Evicted idle rate limit keys");
        }
        evicted
    }

    pub async fn tracked_keys(&self) -> usize {
        self.logs.lock().await.len()
    }
}

fn evict_idle_locked(
    logs: &mut HashMap<IpAddr, VecDeque<DateTime<Utc>>>,
    now: DateTime<Utc>,
    window: Duration,
) -> usize {
    let before = logs.len();
    logs.retain(|_, log| log.back().is_some_and(|newest| now - *newest < window));
    before - logs.len()
}

/// Limits POST requests per remote address; other methods pass through uncounted.
pub struct RateLimitMiddleware {
    store: Arc<RateLimitStore>,
}

impl RateLimitMiddleware {
    pub fn new(store: Arc<RateLimitStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RateLimitStore> {
        &self.store
    }
}

#[async_trait]
impl Middleware for RateLimitMiddleware {
    #[instrument(skip(self, request), fields(path = %request.path))]
    async fn before(&self, request: &ChatRequest) -> Result<bool> {
        if request.method != Method::Post {
            return Ok(true);
        }

        let addr = request.remote_addr();
        if self.store.check_and_record(addr, request.received_at()).await {
            Ok(true)
        } else {
            warn!(remote_addr = %addr, "Rate limit exceeded");
            Err(ChatError::PermissionDenied(RATE_LIMIT_REJECTION.to_string()))
        }
    }
}
