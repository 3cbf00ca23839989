//! Redelivery guard for webhook events.
//!
//! Platforms redeliver webhook events they consider unacknowledged. The guard
//! remembers event ids for a time window so a redelivered event does not
//! produce a second exchange (and a second reply).

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Time-windowed set of recently seen event ids.
pub struct RedeliveryGuard {
    seen: DashMap<String, Instant>,
    window: Duration,
}

impl RedeliveryGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            window,
        }
    }

    /// Record `event_id` and report whether this is its first delivery
    /// within the window.
    pub fn first_delivery(&self, event_id: &str) -> bool {
        self.first_delivery_at(event_id, Instant::now())
    }

    /// Same as [`first_delivery`](Self::first_delivery) with an explicit clock.
    pub fn first_delivery_at(&self, event_id: &str, now: Instant) -> bool {
        match self.seen.entry(event_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if now.saturating_duration_since(*entry.get()) < self.window {
                    false
                } else {
                    entry.insert(now);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        }
    }

    /// Forget ids older than the window. Returns how many were dropped.
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.seen.len();
        self.seen
            .retain(|_, seen_at| now.saturating_duration_since(*seen_at) < self.window);
        before.saturating_sub(self.seen.len())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_within_window_rejected() {
        let guard = RedeliveryGuard::new(Duration::from_secs(60));
        let now = Instant::now();

        assert!(guard.first_delivery_at("evt-1", now));
        assert!(!guard.first_delivery_at("evt-1", now + Duration::from_secs(10)));
        assert!(guard.first_delivery_at("evt-2", now));
    }

    #[test]
    fn test_same_id_after_window_accepted() {
        let guard = RedeliveryGuard::new(Duration::from_secs(60));
        let now = Instant::now();

        assert!(guard.first_delivery_at("evt-1", now));
        assert!(guard.first_delivery_at("evt-1", now + Duration::from_secs(61)));
    }

    #[test]
    fn test_prune_drops_expired_ids() {
        let guard = RedeliveryGuard::new(Duration::from_secs(60));
        let now = Instant::now();
        guard.first_delivery_at("old", now);
        guard.first_delivery_at("new", now + Duration::from_secs(50));

        let pruned = guard.prune(now + Duration::from_secs(70));

        assert_eq!(pruned, 1);
        assert_eq!(guard.len(), 1);
        assert!(!guard.first_delivery_at("new", now + Duration::from_secs(70)));
    }
}
