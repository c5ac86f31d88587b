//! Fixed-window rate-limit policy math.
//!
//! A policy grants `points` requests per `window`. Windows are aligned to
//! the Unix epoch so every node and the Redis store agree on bucket
//! boundaries.

use std::time::Duration;

/// A named request allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub name: &'static str,
    pub points: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    /// General API traffic: 300 requests per 15 minutes.
    pub const API: Self = Self {
        name: "api",
        points: 300,
        window: Duration::from_secs(15 * 60),
    };

    /// Login, registration and token refresh: 10 per 15 minutes.
    pub const AUTH: Self = Self {
        name: "auth",
        points: 10,
        window: Duration::from_secs(15 * 60),
    };

    /// File uploads: 30 per hour.
    pub const UPLOAD: Self = Self {
        name: "upload",
        points: 30,
        window: Duration::from_secs(60 * 60),
    };

    /// AI content generation: 20 per hour.
    pub const AI: Self = Self {
        name: "ai",
        points: 20,
        window: Duration::from_secs(60 * 60),
    };

    pub fn with_points(self, points: u32) -> Self {
        Self { points, ..self }
    }

    pub fn window_secs(&self) -> i64 {
        self.window.as_secs().max(1) as i64
    }

    /// Storage key for `subject` in the window containing `now_unix`.
    pub fn bucket_key(&self, subject: &str, now_unix: i64) -> String {
        format!(
            "ratelimit:{}:{}:{}",
            self.name,
            subject,
            window_start(now_unix, self.window)
        )
    }
}

/// Start (Unix seconds) of the fixed window containing `now_unix`.
pub fn window_start(now_unix: i64, window: Duration) -> i64 {
    let secs = window.as_secs().max(1) as i64;
    now_unix - now_unix.rem_euclid(secs)
}

/// Outcome of counting one request against a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

/// Decide on a request given the window's count *including* this request.
pub fn evaluate(count: u64, policy: &RateLimitPolicy, now_unix: i64) -> RateDecision {
    let window_secs = policy.window_secs();
    let reset_at = window_start(now_unix, policy.window) + window_secs;
    let reset_after = Duration::from_secs((reset_at - now_unix).max(1) as u64);
    let limit = u64::from(policy.points);

    RateDecision {
        allowed: count <= limit,
        limit: policy.points,
        remaining: limit.saturating_sub(count) as u32,
        reset_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_align_to_epoch() {
        let w = Duration::from_secs(900);
        assert_eq!(window_start(0, w), 0);
        assert_eq!(window_start(899, w), 0);
        assert_eq!(window_start(900, w), 900);
        assert_eq!(window_start(1_000, w), 900);
    }

    #[test]
    fn allows_up_to_points_then_denies() {
        let policy = RateLimitPolicy::AUTH;
        let first = evaluate(1, &policy, 1_000);
        assert!(first.allowed);
        assert_eq!(first.remaining, 9);

        let last = evaluate(10, &policy, 1_000);
        assert!(last.allowed);
        assert_eq!(last.remaining, 0);

        let over = evaluate(11, &policy, 1_000);
        assert!(!over.allowed);
        assert_eq!(over.remaining, 0);
    }

    #[test]
    fn reset_after_counts_down_to_window_end() {
        let policy = RateLimitPolicy::API;
        // window [900, 1800)
        let d = evaluate(1, &policy, 1_000);
        assert_eq!(d.reset_after, Duration::from_secs(800));
    }

    #[test]
    fn bucket_keys_change_with_window() {
        let policy = RateLimitPolicy::UPLOAD;
        let a = policy.bucket_key("user:1", 10);
        let b = policy.bucket_key("user:1", 3_599);
        let c = policy.bucket_key("user:1", 3_600);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("ratelimit:upload:user:1:"));
    }

    #[test]
    fn points_override_keeps_window() {
        let p = RateLimitPolicy::AI.with_points(5);
        assert_eq!(p.points, 5);
        assert_eq!(p.window, RateLimitPolicy::AI.window);
    }
}
