// Fixed-window rate limiting for platform actions, keyed by (user, action).
// A counter and window-start timestamp are reset whenever the window has
// elapsed, incremented otherwise, and the action is rejected once the
// counter reaches the configured maximum within the current window.
//
// A storage error during the check allows the action: availability over
// strictness, matching the platform's behavior.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Actions subject to per-user limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LimitedAction {
    CreateNote,
    TranscribeChunk,
}

impl LimitedAction {
    pub fn key(&self) -> &'static str {
        match self {
            LimitedAction::CreateNote => "create_note",
            LimitedAction::TranscribeChunk => "transcribe_chunk",
        }
    }
}

/// One counter row
#[derive(Debug, Clone)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: DateTime<Utc>,
}

/// Storage for rate-limit counters
#[async_trait::async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn fetch(&self, user_id: &str, action: &str) -> Result<Option<RateWindow>>;

    async fn put(&self, user_id: &str, action: &str, window: RateWindow) -> Result<()>;
}

/// In-memory counter storage
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    rows: Mutex<HashMap<(String, String), RateWindow>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn fetch(&self, user_id: &str, action: &str) -> Result<Option<RateWindow>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), action.to_string()))
            .cloned())
    }

    async fn put(&self, user_id: &str, action: &str, window: RateWindow) -> Result<()> {
        self.rows
            .lock()
            .unwrap()
            .insert((user_id.to_string(), action.to_string()), window);
        Ok(())
    }
}

/// Maximum count within a rolling window
#[derive(Debug, Clone, Copy)]
pub struct LimitRule {
    pub max_count: u32,
    pub window_secs: u64,
}

/// Fixed-window limiter over a counter store
pub struct FixedWindowLimiter {
    store: Arc<dyn RateLimitStore>,
    create_note: LimitRule,
    transcribe_chunk: LimitRule,
}

impl FixedWindowLimiter {
    pub fn new(
        store: Arc<dyn RateLimitStore>,
        create_note: LimitRule,
        transcribe_chunk: LimitRule,
    ) -> Self {
        Self {
            store,
            create_note,
            transcribe_chunk,
        }
    }

    fn rule(&self, action: LimitedAction) -> LimitRule {
        match action {
            LimitedAction::CreateNote => self.create_note,
            LimitedAction::TranscribeChunk => self.transcribe_chunk,
        }
    }

    /// Returns true when the action is allowed
    pub async fn check(&self, user_id: &str, action: LimitedAction) -> bool {
        self.check_at(user_id, action, Utc::now()).await
    }

    async fn check_at(&self, user_id: &str, action: LimitedAction, now: DateTime<Utc>) -> bool {
        let rule = self.rule(action);
        let key = action.key();

        let current = match self.store.fetch(user_id, key).await {
            Ok(row) => row,
            Err(e) => {
                warn!("Rate limit check failed, allowing {}: {}", key, e);
                return true;
            }
        };

        let fresh = RateWindow {
            count: 1,
            window_start: now,
        };

        let next = match current {
            None => fresh,
            Some(row) if now - row.window_start >= Duration::seconds(rule.window_secs as i64) => {
                fresh
            }
            Some(row) if row.count >= rule.max_count => return false,
            Some(row) => RateWindow {
                count: row.count + 1,
                window_start: row.window_start,
            },
        };

        if let Err(e) = self.store.put(user_id, key, next).await {
            warn!("Rate limit update failed, allowing {}: {}", key, e);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter_with(store: Arc<dyn RateLimitStore>, max_count: u32) -> FixedWindowLimiter {
        FixedWindowLimiter::new(
            store,
            LimitRule {
                max_count,
                window_secs: 3600,
            },
            LimitRule {
                max_count,
                window_secs: 3600,
            },
        )
    }

    #[tokio::test]
    async fn test_rejects_at_max_within_window() {
        let limiter = limiter_with(Arc::new(InMemoryRateLimitStore::new()), 2);

        assert!(limiter.check("alice", LimitedAction::CreateNote).await);
        assert!(limiter.check("alice", LimitedAction::CreateNote).await);
        assert!(!limiter.check("alice", LimitedAction::CreateNote).await);
    }

    #[tokio::test]
    async fn test_counters_are_per_user_and_per_action() {
        let limiter = limiter_with(Arc::new(InMemoryRateLimitStore::new()), 1);

        assert!(limiter.check("alice", LimitedAction::CreateNote).await);
        assert!(!limiter.check("alice", LimitedAction::CreateNote).await);

        // Other users and other actions have their own counters
        assert!(limiter.check("bob", LimitedAction::CreateNote).await);
        assert!(limiter.check("alice", LimitedAction::TranscribeChunk).await);
    }

    #[tokio::test]
    async fn test_window_elapse_resets_counter() {
        let limiter = limiter_with(Arc::new(InMemoryRateLimitStore::new()), 1);

        let t0 = Utc::now();
        assert!(limiter.check_at("alice", LimitedAction::CreateNote, t0).await);
        assert!(!limiter.check_at("alice", LimitedAction::CreateNote, t0).await);

        let later = t0 + Duration::seconds(3601);
        assert!(
            limiter
                .check_at("alice", LimitedAction::CreateNote, later)
                .await
        );
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl RateLimitStore for FailingStore {
        async fn fetch(&self, _user_id: &str, _action: &str) -> Result<Option<RateWindow>> {
            anyhow::bail!("storage unavailable")
        }

        async fn put(&self, _user_id: &str, _action: &str, _window: RateWindow) -> Result<()> {
            anyhow::bail!("storage unavailable")
        }
    }

    #[tokio::test]
    async fn test_storage_error_fails_open() {
        let limiter = limiter_with(Arc::new(FailingStore), 0);

        assert!(limiter.check("alice", LimitedAction::CreateNote).await);
    }
}
