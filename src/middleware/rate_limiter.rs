//! Per-client token bucket rate limiting

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use super::client_ip::client_ip;
use crate::error::ApiError;

/// Buckets untouched for this long are swept.
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

/// Shared limiter, one bucket per client address.
///
/// Each client may burst up to twice the sustained rate. Clients are keyed by
/// peer address; `X-Forwarded-For` / `X-Real-IP` are only honoured behind a
/// trusted proxy.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
    rate: f64,
    burst: f64,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32, trust_proxy_headers: bool) -> Self {
        let rate = f64::from(requests_per_second.max(1));
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            rate,
            burst: rate * 2.0,
            trust_proxy_headers,
        }
    }

    /// Bucket key for `request`
    pub fn client_key(&self, request: &Request) -> String {
        let forwarded = if self.trust_proxy_headers {
            client_ip(request.headers())
        } else {
            None
        };

        forwarded
            .or_else(|| {
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Take one token for `client`, or report how long until one is available.
    pub async fn acquire(&self, client: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets.entry(client.to_string()).or_insert(Bucket {
            tokens: self.burst,
            refilled_at: now,
        });

        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate))
        }
    }

    /// Drop buckets idle for longer than `max_idle`
    pub async fn sweep(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;
        let before = buckets.len();
        buckets.retain(|_, bucket| now.duration_since(bucket.refilled_at) < max_idle);
        before - buckets.len()
    }

    /// Sweep idle buckets in the background. No-op outside a tokio runtime.
    pub fn spawn_sweeper(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let limiter = self.clone();
        runtime.spawn(async move {
            let mut ticker = tokio::time::interval(IDLE_BUCKET_TTL);
            loop {
                ticker.tick().await;
                let dropped = limiter.sweep(IDLE_BUCKET_TTL).await;
                if dropped > 0 {
                    tracing::debug!(dropped, "Swept idle rate limit buckets");
                }
            }
        });
    }
}

/// Reject over-limit clients with 429 and a `Retry-After` in whole seconds
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = limiter.client_key(&request);

    if let Err(wait) = limiter.acquire(&client).await {
        let retry_after = wait.as_secs_f64().ceil().max(1.0) as u64;
        tracing::warn!(client = %client, retry_after, "Rate limit exceeded");

        let mut response = ApiError::TooManyRequests.into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        return response;
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_then_refusal() {
        let limiter = RateLimiter::new(5, false);

        for _ in 0..10 {
            assert!(limiter.acquire("203.0.113.7").await.is_ok());
        }
        let wait = limiter.acquire("203.0.113.7").await.unwrap_err();
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_clients_have_separate_buckets() {
        let limiter = RateLimiter::new(1, false);

        assert!(limiter.acquire("client-a").await.is_ok());
        assert!(limiter.acquire("client-a").await.is_ok());
        assert!(limiter.acquire("client-a").await.is_err());
        assert!(limiter.acquire("client-b").await.is_ok());
    }

    fn request_from(peer: &str, forwarded_for: &str) -> Request {
        let mut request = axum::http::Request::builder()
            .header("x-forwarded-for", forwarded_for)
            .body(axum::body::Body::empty())
            .unwrap();
        let addr: SocketAddr = peer.parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        request
    }

    #[test]
    fn test_forwarding_headers_need_a_trusted_proxy() {
        let request = request_from("198.51.100.4:40112", "203.0.113.7");

        assert_eq!(RateLimiter::new(1, false).client_key(&request), "198.51.100.4");
        assert_eq!(RateLimiter::new(1, true).client_key(&request), "203.0.113.7");
    }

    #[test]
    fn test_peer_address_keys_clients_without_headers() {
        let mut request = axum::http::Request::builder()
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(RateLimiter::new(1, true).client_key(&request), "unknown");

        let addr: SocketAddr = "198.51.100.4:40112".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));
        assert_eq!(RateLimiter::new(1, true).client_key(&request), "198.51.100.4");
    }

    #[tokio::test]
    async fn test_sweep_drops_idle_buckets() {
        let limiter = RateLimiter::new(1, false);
        limiter.acquire("client-a").await.unwrap();
        limiter.acquire("client-b").await.unwrap();

        assert_eq!(limiter.sweep(Duration::from_secs(60)).await, 0);
        assert_eq!(limiter.sweep(Duration::ZERO).await, 2);
        assert!(limiter.buckets.lock().await.is_empty());
    }
}
