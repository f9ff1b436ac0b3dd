//! Per-source-address request quota.
//!
//! Each client IP may make `max_requests` requests per fixed `window`. The
//! window opens with the first request from that address and its count
//! resets once the window has fully elapsed.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use crate::error::AppError;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// RateLimitState
///
/// Request counters shared by every request. Cloning shares the same counters.
#[derive(Clone)]
pub struct RateLimitState {
    max_requests: u32,
    window: Duration,
    counters: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

impl RateLimitState {
    /// A quota of zero is treated as one request per window.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            counters: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Admits or rejects one request from `ip`.
    pub fn check(&self, ip: IpAddr) -> Result<(), AppError> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> Result<(), AppError> {
        let mut counters = self.counters();
        let entry = counters.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            tracing::debug!(%ip, "Rate limit exceeded");
            return Err(AppError::RateLimited);
        }

        entry.count += 1;
        Ok(())
    }

    /// Drops counters whose window has expired. Called periodically from `main`.
    pub fn cleanup(&self) {
        self.cleanup_at(Instant::now());
    }

    fn cleanup_at(&self, now: Instant) {
        let window = self.window;
        let mut counters = self.counters();
        counters.retain(|_, entry| now.duration_since(entry.started) < window);
        counters.shrink_to_fit();
    }

    pub fn tracked_addresses(&self) -> usize {
        self.counters().len()
    }

    // A panic while holding the lock cannot leave a counter half-updated.
    fn counters(&self) -> MutexGuard<'_, HashMap<IpAddr, Window>> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// rate_limit_middleware
///
/// Keys on the peer address from `ConnectInfo`. Requests without one (e.g.
/// a router driven directly in tests) share a single counter.
pub async fn rate_limit_middleware(
    State(limits): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    match limits.check(ip) {
        Ok(()) => next.run(request).await,
        Err(rejection) => rejection.into_response(),
    }
}
