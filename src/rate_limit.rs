use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

/// Sliding window in-memory rate limiter (process local).
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    store: Arc<DashMap<String, VecDeque<Instant>>>,
    pub enabled: bool,
}

impl InMemoryRateLimiter {
    pub fn new(enabled: bool) -> Self {
        Self { store: Arc::new(DashMap::new()), enabled }
    }

    /// Returns true if allowed, false if limited.
    pub fn check(&self, key: &str, limit: usize, window: Duration) -> bool {
        if !self.enabled { return true; }
        let now = Instant::now();
        let mut entry = self.store.entry(key.to_string()).or_default();
        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= window { entry.pop_front(); } else { break; }
        }
        if entry.len() < limit {
            entry.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Per-action limits derived from env.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub submit_limit: usize,
    pub submit_window: Duration,
    pub ticket_limit: usize,
    pub ticket_window: Duration,
    pub register_limit: usize,
    pub register_window: Duration,
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        fn usize_env(name: &str, default: usize) -> usize { std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default) }
        fn dur_env(name: &str, default: u64) -> Duration { Duration::from_secs(std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)) }
        Self {
            submit_limit: usize_env("RL_SUBMIT_LIMIT", 20),
            submit_window: dur_env("RL_SUBMIT_WINDOW", 3600),
            ticket_limit: usize_env("RL_TICKET_LIMIT", 5),
            ticket_window: dur_env("RL_TICKET_WINDOW", 600),
            register_limit: usize_env("RL_REGISTER_LIMIT", 10),
            register_window: dur_env("RL_REGISTER_WINDOW", 3600),
        }
    }

    pub fn enabled_from_env() -> bool {
        std::env::var("RATE_LIMIT_ENABLED").map(|v| !(v == "0" || v.eq_ignore_ascii_case("false"))).unwrap_or(true)
    }
}

/// High level guard used by handlers.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }
    pub fn from_env() -> Self { Self::new(InMemoryRateLimiter::new(RateLimitConfig::enabled_from_env()), RateLimitConfig::from_env()) }
    pub fn allow_submit(&self, ip: &str) -> bool { self.limiter.check(&format!("submit:{ip}"), self.cfg.submit_limit, self.cfg.submit_window) }
    pub fn allow_ticket(&self, ip: &str) -> bool { self.limiter.check(&format!("ticket:{ip}"), self.cfg.ticket_limit, self.cfg.ticket_window) }
    pub fn allow_register(&self, ip: &str) -> bool { self.limiter.check(&format!("register:{ip}"), self.cfg.register_limit, self.cfg.register_window) }
}
