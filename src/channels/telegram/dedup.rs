//! Telegram update deduplication cache

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Default dedup TTL (5 minutes)
const DEDUP_TTL_SECS: u64 = 300;

/// Maximum dedup cache entries
const DEDUP_MAX_ENTRIES: usize = 2000;

/// Remembers recently seen update ids
///
/// A retried `getUpdates` can hand back updates that were already processed.
/// Entries expire after a TTL and the oldest is evicted at capacity.
#[derive(Debug)]
pub struct UpdateDedup {
    seen: HashMap<i64, Instant>,
    order: VecDeque<i64>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for UpdateDedup {
    fn default() -> Self {
        Self::with_limits(Duration::from_secs(DEDUP_TTL_SECS), DEDUP_MAX_ENTRIES)
    }
}

impl UpdateDedup {
    /// Create a cache with an explicit TTL and capacity
    #[must_use]
    pub fn with_limits(ttl: Duration, max_entries: usize) -> Self {
        Self {
            seen: HashMap::new(),
            order: VecDeque::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Record `update_id`, returning `true` if it was already seen within the TTL
    pub fn is_duplicate(&mut self, update_id: i64) -> bool {
        let now = Instant::now();
        self.evict_expired(now);

        if self.seen.contains_key(&update_id) {
            return true;
        }

        if self.seen.len() >= self.max_entries
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }

        self.seen.insert(update_id, now);
        self.order.push_back(update_id);
        false
    }

    /// Number of remembered ids
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing is remembered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(&oldest) = self.order.front() {
            match self.seen.get(&oldest) {
                Some(ts) if now.duration_since(*ts) < self.ttl => break,
                _ => {
                    self.order.pop_front();
                    self.seen.remove(&oldest);
                }
            }
        }
    }
}
