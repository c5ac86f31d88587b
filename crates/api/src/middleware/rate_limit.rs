//! Fixed-window rate limiting.
//!
//! Counters live in Redis when `REDIS_URL` is set and reachable, otherwise
//! in process memory. A Redis failure on any single request falls back to
//! the memory store for that request, so an outage loosens limits to
//! per-node instead of failing requests.
//!
//! The subject is the user id when the request carries a valid access
//! token, otherwise the client IP.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use propdesk_core::rate_limit::{evaluate, RateDecision, RateLimitPolicy};
use redis::aio::ConnectionManager;

use super::auth::verified_claims;
use crate::config::RateLimitConfig;
use crate::error::AppError;
use crate::state::AppState;

const REDIS_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const REDIS_COMMAND_TIMEOUT: Duration = Duration::from_millis(250);
/// Minimum seconds between sweeps of expired in-memory windows.
const PRUNE_INTERVAL_SECS: i64 = 60;

pub const HEADER_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const HEADER_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

#[derive(Default)]
struct MemoryStore {
    /// Bucket key -> (count, window end as Unix seconds).
    counts: HashMap<String, (u64, i64)>,
    last_prune: i64,
}

impl MemoryStore {
    fn incr(&mut self, key: &str, expires_at: i64, now: i64) -> u64 {
        if now - self.last_prune >= PRUNE_INTERVAL_SECS {
            self.counts.retain(|_, (_, end)| *end > now);
            self.last_prune = now;
        }
        let entry = self.counts.entry(key.to_string()).or_insert((0, expires_at));
        entry.0 += 1;
        entry.0
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    redis: Option<ConnectionManager>,
    memory: Mutex<MemoryStore>,
}

impl RateLimiter {
    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self {
            config,
            redis: None,
            memory: Mutex::new(MemoryStore::default()),
        }
    }

    /// Connect to Redis if configured. An unreachable Redis is logged and
    /// the limiter runs from memory.
    pub async fn connect(config: RateLimitConfig) -> Self {
        let Some(url) = config.redis_url.clone() else {
            tracing::info!("REDIS_URL not set, rate limiting uses in-memory counters");
            return Self::in_memory(config);
        };

        let connect = async {
            let client = redis::Client::open(url.as_str())?;
            client.get_connection_manager().await
        };
        let redis = match tokio::time::timeout(REDIS_CONNECT_TIMEOUT, connect).await {
            Ok(Ok(manager)) => {
                tracing::info!("Rate limiting backed by Redis");
                Some(manager)
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Redis unavailable, rate limiting uses in-memory counters");
                None
            }
            Err(_) => {
                tracing::warn!("Redis connect timed out, rate limiting uses in-memory counters");
                None
            }
        };

        Self {
            config,
            redis,
            memory: Mutex::new(MemoryStore::default()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn uses_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Count one request from `subject` against `policy`.
    pub async fn hit(&self, policy: &RateLimitPolicy, subject: &str) -> RateDecision {
        let now = chrono::Utc::now().timestamp();
        let key = policy.bucket_key(subject, now);
        let window_secs = policy.window_secs();

        let count = match &self.redis {
            Some(manager) => {
                let attempt =
                    tokio::time::timeout(REDIS_COMMAND_TIMEOUT, redis_incr(manager, &key, window_secs));
                match attempt.await {
                    Ok(Ok(count)) => count,
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, key, "Redis rate-limit failed, using memory");
                        self.memory_incr(&key, window_secs, now)
                    }
                    Err(_) => {
                        tracing::warn!(key, "Redis rate-limit timed out, using memory");
                        self.memory_incr(&key, window_secs, now)
                    }
                }
            }
            None => self.memory_incr(&key, window_secs, now),
        };

        evaluate(count, policy, now)
    }

    fn memory_incr(&self, key: &str, window_secs: i64, now: i64) -> u64 {
        let expires_at = now - now.rem_euclid(window_secs) + window_secs;
        // A panic while holding the lock leaves only counters behind.
        let mut store = self.memory.lock().unwrap_or_else(PoisonError::into_inner);
        store.incr(key, expires_at, now)
    }
}

async fn redis_incr(
    manager: &ConnectionManager,
    key: &str,
    window_secs: i64,
) -> Result<u64, redis::RedisError> {
    let mut conn = manager.clone();
    let (count,): (u64,) = redis::pipe()
        .atomic()
        .incr(key, 1)
        .expire(key, window_secs)
        .ignore()
        .query_async(&mut conn)
        .await?;
    Ok(count)
}

/// Rate-limit subject: `user:<id>` for a valid token, else `ip:<addr>`.
fn subject(request: &Request, state: &AppState) -> String {
    if let Some(claims) = verified_claims(request.headers(), &state.config.jwt) {
        return format!("user:{}", claims.sub);
    }
    if let Some(ip) = forwarded_for(request.headers()) {
        return format!("ip:{ip}");
    }
    match request.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "ip:unknown".to_string(),
    }
}

/// First hop of `X-Forwarded-For`.
fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Set the limit headers unless an inner, more specific policy already did.
fn apply_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers
        .entry(HEADER_LIMIT)
        .or_insert_with(|| HeaderValue::from(decision.limit));
    headers
        .entry(HEADER_REMAINING)
        .or_insert_with(|| HeaderValue::from(decision.remaining));
}

async fn enforce(
    state: &AppState,
    policy: RateLimitPolicy,
    request: Request,
    next: Next,
) -> Response {
    if !state.rate_limiter.config().enabled {
        return next.run(request).await;
    }

    let subject = subject(&request, state);
    let decision = state.rate_limiter.hit(&policy, &subject).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(policy = policy.name, subject = %subject, "Rate limit exceeded");
        AppError::RateLimited {
            retry_after_secs: decision.reset_after.as_secs().max(1),
        }
        .into_response()
    };
    apply_headers(response.headers_mut(), &decision);
    response
}

pub async fn api_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let policy = state.rate_limiter.config().api;
    enforce(&state, policy, request, next).await
}

pub async fn auth_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let policy = state.rate_limiter.config().auth;
    enforce(&state, policy, request, next).await
}

pub async fn upload_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let policy = state.rate_limiter.config().upload;
    enforce(&state, policy, request, next).await
}

pub async fn ai_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let policy = state.rate_limiter.config().ai;
    enforce(&state, policy, request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(points: u32) -> RateLimitPolicy {
        RateLimitPolicy::AUTH.with_points(points)
    }

    #[tokio::test]
    async fn memory_store_denies_after_points() {
        let limiter = RateLimiter::in_memory(RateLimitConfig::default());
        let p = policy(3);
        for expected_remaining in [2, 1, 0] {
            let d = limiter.hit(&p, "ip:1.2.3.4").await;
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }
        let denied = limiter.hit(&p, "ip:1.2.3.4").await;
        assert!(!denied.allowed);
        assert!(denied.reset_after.as_secs() >= 1);
    }

    #[tokio::test]
    async fn subjects_are_counted_separately() {
        let limiter = RateLimiter::in_memory(RateLimitConfig::default());
        let p = policy(1);
        assert!(limiter.hit(&p, "user:1").await.allowed);
        assert!(limiter.hit(&p, "user:2").await.allowed);
        assert!(!limiter.hit(&p, "user:1").await.allowed);
    }

    #[tokio::test]
    async fn unreachable_redis_falls_back_to_memory() {
        let config = RateLimitConfig {
            redis_url: Some("redis://127.0.0.1:1/".into()),
            ..RateLimitConfig::default()
        };
        let limiter = RateLimiter::connect(config).await;
        assert!(!limiter.uses_redis());

        let p = policy(1);
        assert!(limiter.hit(&p, "ip:9.9.9.9").await.allowed);
        assert!(!limiter.hit(&p, "ip:9.9.9.9").await.allowed);
    }

    #[test]
    fn expired_windows_are_pruned() {
        let mut store = MemoryStore::default();
        store.incr("old", 100, 50);
        store.incr("fresh", 1_000, 200);
        assert!(!store.counts.contains_key("old"));
        assert!(store.counts.contains_key("fresh"));
    }

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(forwarded_for(&headers).as_deref(), Some("203.0.113.7"));
        assert_eq!(forwarded_for(&HeaderMap::new()), None);
    }

    #[test]
    fn inner_policy_headers_win() {
        let mut headers = HeaderMap::new();
        let inner = RateDecision {
            allowed: true,
            limit: 10,
            remaining: 9,
            reset_after: Duration::from_secs(5),
        };
        let outer = RateDecision {
            limit: 300,
            remaining: 299,
            ..inner
        };
        apply_headers(&mut headers, &inner);
        apply_headers(&mut headers, &outer);
        assert_eq!(headers[HEADER_LIMIT], "10");
        assert_eq!(headers[HEADER_REMAINING], "9");
    }
}
