use adaptcore::{RateDecision, RateLimiter, TierResolver, UserTier};
use adaptruntime::{RateLimitsConfig, TiersConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Tiers from configuration: per-user overrides, else the default tier
pub struct StaticTierResolver {
    config: TiersConfig,
}

impl StaticTierResolver {
    pub fn new(config: TiersConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TierResolver for StaticTierResolver {
    async fn resolve_tier(&self, user_id: &str) -> UserTier {
        self.config
            .users
            .get(user_id)
            .copied()
            .unwrap_or(self.config.default)
    }
}

struct Window {
    started: Instant,
    count: u32,
}

/// Per-user request counter that resets every window
pub struct FixedWindowRateLimiter {
    limits: RateLimitsConfig,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowRateLimiter {
    pub fn new(limits: RateLimitsConfig) -> Self {
        Self::with_window(limits, Duration::from_secs(60))
    }

    pub fn with_window(limits: RateLimitsConfig, window: Duration) -> Self {
        Self {
            limits,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for FixedWindowRateLimiter {
    async fn check(&self, user_id: &str, tier: UserTier, model_key: &str) -> RateDecision {
        let limit = self.limits.per_minute(tier);
        let now = Instant::now();

        let mut windows = self.windows.lock().await;
        let window = windows.entry(user_id.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count < limit {
            window.count += 1;
            return RateDecision::Allowed;
        }

        let remaining = self.window.saturating_sub(now.duration_since(window.started));
        tracing::debug!(user = user_id, model = model_key, limit, "Rate window exhausted");
        RateDecision::Rejected {
            reason: format!("{} tier allows {} paid requests per minute", tier.as_str(), limit),
            retry_after_secs: remaining.as_secs().max(1),
        }
    }
}
