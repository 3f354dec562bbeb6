//! Per-route in-memory rate limiting.
//!
//! Each route group (upload, download, metadata) carries its own limiter with
//! its own window, keyed by client IP. Buckets live in sharded maps to reduce
//! lock contention.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use flashdrop_core::config::RateLimit;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const SHARD_COUNT: usize = 16;
const MAX_BUCKETS_PER_SHARD: usize = 10_000;

#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        // Reset if window expired
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }
}

/// Fixed-window limiter for one route group.
pub struct RouteRateLimiter {
    scope: &'static str,
    limit: u32,
    window: Duration,
    shards: Vec<Mutex<HashMap<String, RateLimitBucket>>>,
}

impl RouteRateLimiter {
    pub fn new(scope: &'static str, limit: RateLimit) -> Arc<Self> {
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect();
        Arc::new(Self {
            scope,
            limit: limit.max_requests,
            window: limit.window,
            shards,
        })
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Check and count one request for `key`. Returns the remaining budget,
    /// or the time until the window resets when the limit is exceeded.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        let shard = &self.shards[self.shard_index(key)];
        let mut buckets = shard.lock().await;

        // Shed expired buckets when a shard fills up, so abandoned client
        // IPs cannot grow the map without bound.
        if buckets.len() >= MAX_BUCKETS_PER_SHARD {
            let now = Instant::now();
            buckets.retain(|_, bucket| bucket.reset_at > now);
        }

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(self.window));

        let (allowed, remaining) = bucket.check_and_increment(self.limit, self.window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }
}

fn client_key(request: &Request) -> String {
    // First X-Forwarded-For hop when behind a proxy, socket address otherwise.
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return format!("ip:{}", forwarded);
    }

    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

fn set_header(response: &mut Response, name: &'static str, value: String) {
    if let Ok(header_value) = HeaderValue::from_str(&value) {
        response.headers_mut().insert(name, header_value);
    }
}

/// Rate limiting middleware, applied per route group.
///
/// Adds `X-RateLimit-Limit` / `X-RateLimit-Remaining` headers to responses
/// and answers `429 Too Many Requests` with `Retry-After` when the budget
/// for the window is spent.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RouteRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match limiter.check(&key).await {
        Ok(remaining) => {
            let mut response = next.run(request).await;
            set_header(&mut response, "X-RateLimit-Limit", limiter.limit().to_string());
            set_header(&mut response, "X-RateLimit-Remaining", remaining.to_string());
            response
        }
        Err(reset_in) => {
            tracing::warn!(
                scope = limiter.scope,
                key = %key,
                limit = limiter.limit(),
                "Rate limit exceeded"
            );

            let reset_seconds = reset_in.as_secs().max(1);

            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                axum::Json(serde_json::json!({
                    "error": "Too many requests. Please slow down.",
                    "code": "RATE_LIMITED"
                })),
            )
                .into_response();

            set_header(&mut response, "X-RateLimit-Limit", limiter.limit().to_string());
            set_header(&mut response, "X-RateLimit-Remaining", "0".to_string());
            set_header(&mut response, "Retry-After", reset_seconds.to_string());

            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window: Duration) -> Arc<RouteRateLimiter> {
        RouteRateLimiter::new(
            "test",
            RateLimit {
                max_requests,
                window,
            },
        )
    }

    #[tokio::test]
    async fn test_requests_under_limit_are_allowed() {
        let limiter = limiter(3, Duration::from_secs(60));

        assert_eq!(limiter.check("ip:1.2.3.4").await, Ok(2));
        assert_eq!(limiter.check("ip:1.2.3.4").await, Ok(1));
        assert_eq!(limiter.check("ip:1.2.3.4").await, Ok(0));
    }

    #[tokio::test]
    async fn test_requests_over_limit_are_rejected() {
        let limiter = limiter(2, Duration::from_secs(60));

        limiter.check("ip:1.2.3.4").await.unwrap();
        limiter.check("ip:1.2.3.4").await.unwrap();

        let reset_in = limiter.check("ip:1.2.3.4").await.unwrap_err();
        assert!(reset_in <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_keys_are_limited_independently() {
        let limiter = limiter(1, Duration::from_secs(60));

        limiter.check("ip:1.2.3.4").await.unwrap();
        assert!(limiter.check("ip:1.2.3.4").await.is_err());
        assert!(limiter.check("ip:5.6.7.8").await.is_ok());
    }

    #[tokio::test]
    async fn test_budget_resets_after_window() {
        let limiter = limiter(1, Duration::from_millis(20));

        limiter.check("ip:1.2.3.4").await.unwrap();
        assert!(limiter.check("ip:1.2.3.4").await.is_err());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.check("ip:1.2.3.4").await.is_ok());
    }
}
