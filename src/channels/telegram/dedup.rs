//! Telegram update deduplication cache

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default dedup TTL (5 minutes)
const DEDUP_TTL_SECS: u64 = 300;

/// Maximum dedup cache entries
const DEDUP_MAX_ENTRIES: usize = 2000;

/// Remembers recently seen update ids
///
/// A restarted poll or an offset that failed to advance can hand back the
/// same update twice; the second copy must not make the bear speak again.
#[derive(Debug)]
pub struct UpdateDedup {
    seen: HashMap<i64, Instant>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for UpdateDedup {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEDUP_TTL_SECS), DEDUP_MAX_ENTRIES)
    }
}

impl UpdateDedup {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            seen: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Returns `true` if `update_id` was seen within the TTL, otherwise
    /// records it and returns `false`
    pub fn is_duplicate(&mut self, update_id: i64) -> bool {
        self.is_duplicate_at(update_id, Instant::now())
    }

    /// [`Self::is_duplicate`] with an explicit clock
    pub fn is_duplicate_at(&mut self, update_id: i64, now: Instant) -> bool {
        if let Some(ts) = self.seen.get(&update_id)
            && now.saturating_duration_since(*ts) < self.ttl
        {
            return true;
        }

        if self.seen.len() >= self.max_entries {
            let ttl = self.ttl;
            self.seen
                .retain(|_, ts| now.saturating_duration_since(*ts) < ttl);
        }

        // Still full: drop the oldest
        if self.seen.len() >= self.max_entries
            && let Some(oldest) = self
                .seen
                .iter()
                .min_by_key(|(_, ts)| **ts)
                .map(|(id, _)| *id)
        {
            self.seen.remove(&oldest);
        }

        self.seen.insert(update_id, now);
        false
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
