//! Concurrent per-user session store.
//!
//! `SessionStore` maps user ids to lazily created sessions in a sharded
//! `DashMap`. Lookup-or-create happens under the shard lock of a single
//! `entry()` call, so two concurrent first messages from the same user always
//! observe the same session.
//!
//! Each session sits behind its own async mutex. A [`SessionHandle`] only
//! exposes the session through [`SessionHandle::lock`], which serializes the
//! read-history -> call-model -> append-history sequence per user while
//! leaving different users fully independent.
//!
//! Retention is bounded by an optional LRU capacity (enforced on insert) and
//! an optional idle TTL (enforced by [`SessionStore::evict_idle`]). A session
//! whose handle is currently held by a worker is never evicted.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use courier_types::error::SessionError;
use courier_types::session::Session;

/// Retention policy for a [`SessionStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum number of sessions. `None` means unbounded.
    pub capacity: Option<usize>,
    /// Idle time after which `evict_idle` drops a session. `None` disables it.
    pub idle_ttl: Option<Duration>,
}

struct SessionSlot {
    session: Mutex<Session>,
    /// Store-wide logical clock value of the last access (LRU ordering).
    last_used_tick: AtomicU64,
    /// Wall-clock millis of the last access (idle expiry).
    last_used_ms: AtomicI64,
}

impl SessionSlot {
    fn new(user_id: &str) -> Self {
        Self {
            session: Mutex::new(Session::new(user_id)),
            last_used_tick: AtomicU64::new(0),
            last_used_ms: AtomicI64::new(0),
        }
    }

    fn touch(&self, tick: u64, now_ms: i64) {
        self.last_used_tick.store(tick, Ordering::Relaxed);
        self.last_used_ms.store(now_ms, Ordering::Relaxed);
    }
}

/// Shared reference to one user's session.
///
/// Cheap to clone. Holding a handle pins the session against eviction, so
/// workers keep it only for the duration of one exchange.
#[derive(Clone)]
pub struct SessionHandle {
    slot: Arc<SessionSlot>,
}

impl SessionHandle {
    /// Acquire exclusive access to the session.
    ///
    /// Waiters are served in FIFO order.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.slot.session.lock().await
    }

    /// Whether two handles refer to the same underlying session.
    pub fn ptr_eq(a: &SessionHandle, b: &SessionHandle) -> bool {
        Arc::ptr_eq(&a.slot, &b.slot)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("last_used_tick", &self.slot.last_used_tick.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Owner of every user's session.
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionSlot>>,
    policy: RetentionPolicy,
    clock: AtomicU64,
    evictions: AtomicU64,
}

impl SessionStore {
    /// Create an empty store with the given retention policy.
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            policy,
            clock: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Create an empty store that never evicts.
    pub fn unbounded() -> Self {
        Self::new(RetentionPolicy::default())
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Return the session for `user_id`, creating an empty one if needed.
    ///
    /// Creation and lookup are one atomic step. When a new session pushes the
    /// store over capacity, the least recently used idle session is evicted.
    pub fn get_or_create(&self, user_id: &str) -> Result<SessionHandle, SessionError> {
        if user_id.is_empty() {
            return Err(SessionError::EmptyUserId);
        }

        let tick = self.next_tick();
        let now_ms = Utc::now().timestamp_millis();

        let (slot, created) = match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => {
                let slot = Arc::new(SessionSlot::new(user_id));
                entry.insert(Arc::clone(&slot));
                (slot, true)
            }
        };
        slot.touch(tick, now_ms);

        if created {
            debug!(user_id, sessions = self.sessions.len(), "created session");
            self.enforce_capacity();
        }

        Ok(SessionHandle { slot })
    }

    /// Look up an existing session without creating or touching it.
    pub fn get(&self, user_id: &str) -> Option<SessionHandle> {
        self.sessions.get(user_id).map(|entry| SessionHandle {
            slot: Arc::clone(entry.value()),
        })
    }

    /// Drop the session for `user_id`. Returns whether one existed.
    ///
    /// Handles already held keep working on the detached session; the next
    /// `get_or_create` starts a fresh one.
    pub fn remove(&self, user_id: &str) -> bool {
        let removed = self.sessions.remove(user_id).is_some();
        if removed {
            debug!(user_id, "removed session");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Total sessions evicted by capacity or idle expiry since creation.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Drop every session idle since before `now - idle_ttl`.
    ///
    /// Sessions with an outstanding handle are kept. Returns the number of
    /// sessions evicted; always 0 when the policy has no idle TTL.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let Some(ttl) = self.policy.idle_ttl else {
            return 0;
        };
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let cutoff_ms = now.timestamp_millis().saturating_sub(ttl_ms);

        let before = self.sessions.len();
        self.sessions.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.last_used_ms.load(Ordering::Relaxed) >= cutoff_ms
        });
        let evicted = before.saturating_sub(self.sessions.len());

        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, remaining = self.sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    fn next_tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Evict least recently used idle sessions until the store fits its capacity.
    fn enforce_capacity(&self) {
        let Some(capacity) = self.policy.capacity else {
            return;
        };

        // Bounded so a store full of in-use sessions cannot spin.
        let mut attempts = self.sessions.len();
        while self.sessions.len() > capacity && attempts > 0 {
            attempts -= 1;

            let victim = self
                .sessions
                .iter()
                .filter(|entry| Arc::strong_count(entry.value()) == 1)
                .min_by_key(|entry| entry.value().last_used_tick.load(Ordering::Relaxed))
                .map(|entry| entry.key().clone());

            let Some(user_id) = victim else {
                warn!(
                    capacity,
                    sessions = self.sessions.len(),
                    "session store over capacity but every session is in use"
                );
                return;
            };

            // Re-check under the shard write lock: a worker may have taken a
            // handle since the scan.
            if self
                .sessions
                .remove_if(&user_id, |_, slot| Arc::strong_count(slot) == 1)
                .is_some()
            {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(user_id = %user_id, "evicted least recently used session");
            }
        }
    }
}
