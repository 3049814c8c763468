use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use dashmap::DashMap;

use crate::config::env_parse;

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

/// Per-action limits.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub post_limit: usize,
    pub post_window: Duration,
    pub comment_limit: usize,
    pub comment_window: Duration,
    pub vote_limit: usize,
    pub vote_window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            post_limit: 5,
            post_window: Duration::from_secs(300),
            comment_limit: 20,
            comment_window: Duration::from_secs(60),
            vote_limit: 60,
            vote_window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        let secs = |name: &str, default: Duration| Duration::from_secs(env_parse(name, default.as_secs()));
        Self {
            post_limit: env_parse("RL_POST_LIMIT", d.post_limit),
            post_window: secs("RL_POST_WINDOW", d.post_window),
            comment_limit: env_parse("RL_COMMENT_LIMIT", d.comment_limit),
            comment_window: secs("RL_COMMENT_WINDOW", d.comment_window),
            vote_limit: env_parse("RL_VOTE_LIMIT", d.vote_limit),
            vote_window: secs("RL_VOTE_WINDOW", d.vote_window),
        }
    }
}

/// Guard used by handlers, keyed by caller.
#[derive(Clone)]
pub struct RateLimiterFacade {
    pub limiter: InMemoryRateLimiter,
    pub cfg: RateLimitConfig,
}

impl RateLimiterFacade {
    pub fn new(limiter: InMemoryRateLimiter, cfg: RateLimitConfig) -> Self { Self { limiter, cfg } }
    pub fn allow_post(&self, caller: &str) -> bool { self.limiter.check(&format!("post:{caller}"), self.cfg.post_limit, self.cfg.post_window) }
    pub fn allow_comment(&self, caller: &str) -> bool { self.limiter.check(&format!("comment:{caller}"), self.cfg.comment_limit, self.cfg.comment_window) }
    pub fn allow_vote(&self, caller: &str) -> bool { self.limiter.check(&format!("vote:{caller}"), self.cfg.vote_limit, self.cfg.vote_window) }
}
