use std::time::{Duration, Instant};

use moka::future::Cache;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining_attempts: u32,
    #[serde(rename = "reset_in_ms", serialize_with = "as_millis")]
    pub reset_in: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl RateLimitDecision {
    /// Whole seconds until the window resets, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.reset_in.as_secs();
        if self.reset_in.subsec_nanos() > 0 { secs + 1 } else { secs }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window attempt counter keyed by caller-chosen strings such as
/// `login:<email>`.
///
/// Entries are bounded by `max_keys` and dropped by the cache after `ttl`
/// without writes, so the map cannot grow without limit. `ttl` must be at
/// least as long as the longest window checked through this limiter.
#[derive(Clone)]
pub struct RateLimiter {
    windows: Cache<String, Window>,
}

impl RateLimiter {
    pub fn new(max_keys: u64, ttl: Duration) -> Self {
        Self {
            windows: Cache::builder()
                .max_capacity(max_keys)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn check(&self, key: &str, config: RateLimitConfig) -> RateLimitDecision {
        self.check_at(key, config, Instant::now()).await
    }

    /// Counts one attempt for `key` as of `now`.
    pub async fn check_at(
        &self,
        key: &str,
        config: RateLimitConfig,
        now: Instant,
    ) -> RateLimitDecision {
        let entry = self
            .windows
            .entry(key.to_string())
            .and_upsert_with(|current| {
                let next = match current.map(|e| e.into_value()) {
                    Some(w) if now < w.reset_at => Window {
                        count: w.count.saturating_add(1),
                        ..w
                    },
                    _ => Window {
                        count: 1,
                        reset_at: now + config.window,
                    },
                };
                std::future::ready(next)
            })
            .await;

        let window = entry.into_value();
        RateLimitDecision {
            allowed: window.count <= config.max_attempts,
            remaining_attempts: config.max_attempts.saturating_sub(window.count),
            reset_in: window.reset_at.saturating_duration_since(now),
        }
    }

    /// Forgets every attempt recorded for `key`.
    pub async fn reset(&self, key: &str) {
        self.windows.invalidate(key).await;
    }
}

pub fn login_key(email: &str) -> String {
    format!("login:{}", email.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(100, Duration::from_secs(300))
    }

    #[actix_web::test]
    async fn blocks_after_max_attempts() {
        let limiter = limiter();
        let config = RateLimitConfig::default();
        let start = Instant::now();

        let mut remaining = Vec::new();
        for i in 0..5 {
            let d = limiter
                .check_at("login:a@b.com", config, start + Duration::from_secs(i))
                .await;
            assert!(d.allowed);
            remaining.push(d.remaining_attempts);
        }
        assert_eq!(remaining, vec![4, 3, 2, 1, 0]);

        let sixth = limiter
            .check_at("login:a@b.com", config, start + Duration::from_secs(10))
            .await;
        assert!(!sixth.allowed);
        assert_eq!(sixth.remaining_attempts, 0);
        assert_eq!(sixth.reset_in, Duration::from_secs(50));
        assert_eq!(sixth.retry_after_secs(), 50);
    }

    #[actix_web::test]
    async fn window_expiry_starts_fresh() {
        let limiter = limiter();
        let config = RateLimitConfig::default();
        let start = Instant::now();

        for _ in 0..6 {
            limiter.check_at("k", config, start).await;
        }
        let later = limiter
            .check_at("k", config, start + Duration::from_secs(61))
            .await;
        assert!(later.allowed);
        assert_eq!(later.remaining_attempts, 4);
        assert_eq!(later.reset_in, Duration::from_secs(60));
    }

    #[actix_web::test]
    async fn keys_are_independent_and_resettable() {
        let limiter = limiter();
        let config = RateLimitConfig {
            max_attempts: 1,
            window: Duration::from_secs(60),
        };
        let now = Instant::now();

        assert!(limiter.check_at("a", config, now).await.allowed);
        assert!(!limiter.check_at("a", config, now).await.allowed);
        assert!(limiter.check_at("b", config, now).await.allowed);

        limiter.reset("a").await;
        assert!(limiter.check_at("a", config, now).await.allowed);
    }

    #[test]
    fn login_keys_ignore_case_and_padding() {
        assert_eq!(login_key(" Taro@Example.com "), "login:taro@example.com");
    }

    #[test]
    fn retry_after_rounds_up() {
        let d = RateLimitDecision {
            allowed: false,
            remaining_attempts: 0,
            reset_in: Duration::from_millis(1500),
        };
        assert_eq!(d.retry_after_secs(), 2);
        assert_eq!(
            serde_json::to_value(d).unwrap()["reset_in_ms"],
            serde_json::json!(1500)
        );
    }
}
