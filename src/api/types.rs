//! Shared types for the HTTP API layer.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, FromRequest, OriginalUri};
use axum::http::{HeaderMap, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use crate::api::error::ApiError;

use crate::config::{RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW_SECS};
use crate::core_state::CoreState;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus the request limiter.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self::with_limiter(core, RateLimiter::new())
    }

    pub fn with_limiter(core: Arc<CoreState>, limiter: RateLimiter) -> Self {
        Self {
            core,
            rate_limiter: Arc::new(Mutex::new(limiter)),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Audit target: set by handlers on the response
// ═══════════════════════════════════════════════════════════

/// Record touched by a handler, read back by the audit middleware.
///
/// Handlers insert it into the response extensions. A `GET` is only
/// audited when its handler sets one.
#[derive(Debug, Clone)]
pub struct AuditTarget {
    pub resource_type: &'static str,
    pub resource_id: String,
}

impl AuditTarget {
    pub fn new(resource_type: &'static str, resource_id: impl ToString) -> Self {
        Self {
            resource_type,
            resource_id: resource_id.to_string(),
        }
    }
}

/// Resource type implied by the path: the segment after `/api/`.
pub fn resource_from_path(path: &str) -> &str {
    path.trim_start_matches('/')
        .trim_start_matches("api/")
        .split('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or("api")
}

// ═══════════════════════════════════════════════════════════
// Client address
// ═══════════════════════════════════════════════════════════

/// Peer address of the request, or the first `X-Forwarded-For` hop
/// when the socket address is not available.
pub fn client_addr<B>(req: &Request<B>) -> Option<String> {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    peer_or_forwarded(peer, req.headers())
}

/// Same as `client_addr`, for handlers that hold the parts separately.
pub fn peer_or_forwarded(peer: Option<SocketAddr>, headers: &HeaderMap) -> Option<String> {
    if let Some(addr) = peer {
        return Some(addr.ip().to_string());
    }
    headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Full request path. Routers nested under `/api` see it stripped.
pub fn request_path<B>(req: &Request<B>) -> String {
    req.extensions()
        .get::<OriginalUri>()
        .map(|OriginalUri(uri)| uri.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

/// Bearer credential from the `Authorization` header, if any.
pub fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

// ═══════════════════════════════════════════════════════════
// Rate limiter: per-client sliding window
// ═══════════════════════════════════════════════════════════

// ═══════════════════════════════════════════════════════════
// Request bodies
// ═══════════════════════════════════════════════════════════

/// `Json<T>` whose rejection is an `ApiError`, so bad bodies get the
/// same `{"error":{..}}` shape as every other failure.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, ApiError> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Per-client sliding-window rate limiter.
pub struct RateLimiter {
    windows: HashMap<String, Vec<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::with_limits(RATE_LIMIT_REQUESTS, Duration::from_secs(RATE_LIMIT_WINDOW_SECS))
    }

    pub fn with_limits(max_requests: usize, window: Duration) -> Self {
        Self {
            windows: HashMap::new(),
            max_requests,
            window,
        }
    }

    /// Check if a client is within its limit. Returns `Ok(())` or
    /// `Err(retry_after_secs)` if exceeded.
    pub fn check(&mut self, client: &str) -> Result<(), u64> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&mut self, client: &str, now: Instant) -> Result<(), u64> {
        // Drop clients with nothing left in their window
        if self.windows.len() > 1000 {
            let window = self.window;
            self.windows
                .retain(|_, hits| hits.iter().any(|ts| now.duration_since(*ts) < window));
        }

        let entries = self.windows.entry(client.to_string()).or_default();
        entries.retain(|ts| now.duration_since(*ts) < self.window);

        if entries.len() >= self.max_requests {
            let oldest = entries.first().copied().unwrap_or(now);
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            return Err(wait.as_secs().max(1));
        }

        entries.push(now);
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
