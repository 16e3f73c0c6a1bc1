// III-IV
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Per-client request rate limiting.

use crate::clocks::Clock;
use crate::env::get_optional_var;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::lock::Mutex;
use log::warn;
use lru_time_cache::LruCache;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// Length of the window during which a client's requests are counted.
const WINDOW: Duration = Duration::from_secs(15 * 60);

/// Default maximum number of requests a client can issue within a window.
const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default maximum number of clients to track at once.
const DEFAULT_CAPACITY: usize = 10 * 1024;

/// Body of the response sent to clients that exceed their quota.
const TOO_MANY_REQUESTS: &str = "Too many requests, please try again later.";

/// Options to configure a `RateLimiter`.
#[derive(Debug, PartialEq)]
pub struct RateLimiterOptions {
    /// Maximum number of requests a client can issue within a window.
    pub max_requests: u32,

    /// Maximum number of clients to track at once.  The least recently seen clients are
    /// forgotten first.
    pub capacity: usize,

    /// Whether to identify clients by the `X-Forwarded-For` header.  Only safe when the service
    /// sits behind a proxy that overwrites this header, as clients can otherwise forge it.
    pub trust_proxy: bool,
}

impl Default for RateLimiterOptions {
    fn default() -> Self {
        Self { max_requests: DEFAULT_MAX_REQUESTS, capacity: DEFAULT_CAPACITY, trust_proxy: false }
    }
}

impl RateLimiterOptions {
    /// Creates a set of options from environment variables whose name is prefixed with the
    /// given `prefix`.
    ///
    /// This will use variables such as `<prefix>_MAX_REQUESTS`, `<prefix>_CAPACITY` and
    /// `<prefix>_TRUST_PROXY`.
    pub fn from_env(prefix: &str) -> Result<Self, String> {
        Ok(Self {
            max_requests: get_optional_var::<u32>(prefix, "MAX_REQUESTS")?
                .unwrap_or(DEFAULT_MAX_REQUESTS),
            capacity: get_optional_var::<usize>(prefix, "CAPACITY")?.unwrap_or(DEFAULT_CAPACITY),
            trust_proxy: get_optional_var::<bool>(prefix, "TRUST_PROXY")?.unwrap_or(false),
        })
    }
}

/// Requests seen from a client in its current window.
struct Window {
    /// When the client issued the first request of the window.
    start: OffsetDateTime,

    /// Number of requests admitted in the window.
    count: u32,
}

/// Fixed-window request counter keyed by client.
#[derive(Clone)]
pub struct RateLimiter {
    /// Source of the current time to open and close windows.
    clock: Arc<dyn Clock + Send + Sync>,

    /// Maximum number of requests a client can issue within a window.
    max_requests: u32,

    /// Whether clients are identified by the `X-Forwarded-For` header.
    trust_proxy: bool,

    /// Open windows by client.
    windows: Arc<Mutex<LruCache<String, Window>>>,
}

impl RateLimiter {
    /// Creates a new rate limiter configured with `opts` that uses `clock` to track time.
    pub fn new(opts: RateLimiterOptions, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let windows = LruCache::with_expiry_duration_and_capacity(WINDOW, opts.capacity);
        Self {
            clock,
            max_requests: opts.max_requests,
            trust_proxy: opts.trust_proxy,
            windows: Arc::from(Mutex::from(windows)),
        }
    }

    /// Records a request from `client` and returns whether it fits within its quota.
    async fn admit(&self, client: &str) -> bool {
        let now = self.clock.now_utc();

        let mut windows = self.windows.lock().await;
        if let Some(window) = windows.get_mut(client) {
            if now - window.start < WINDOW {
                if window.count >= self.max_requests {
                    return false;
                }
                window.count += 1;
                return true;
            }
        }
        windows.insert(client.to_owned(), Window { start: now, count: 1 });
        true
    }
}

/// Identifies the client that issued `request` by the peer address of the connection.
///
/// If `trust_proxy` is true, the first address in `X-Forwarded-For` takes precedence so that
/// clients behind a proxy are told apart.
fn client_key(request: &Request, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').map(str::trim).find(|addr| !addr.is_empty()));
        if let Some(addr) = forwarded {
            return addr.to_owned();
        }
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => "unknown".to_owned(),
    }
}

/// Middleware that rejects requests from clients that exceeded their quota.
pub(crate) async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_key(&request, limiter.trust_proxy);
    if !limiter.admit(&client).await {
        warn!("Rate limit exceeded by client {}", client);
        return (StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS).into_response();
    }
    next.run(request).await
}
