//! Background housekeeping: idle-session expiry and redelivery-guard pruning.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::dispatch::RedeliveryGuard;
use crate::session::SessionStore;

/// Run one sweep. Returns `(sessions_evicted, event_ids_pruned)`.
pub fn sweep_once(store: &SessionStore, guard: &RedeliveryGuard) -> (usize, usize) {
    let evicted = store.evict_idle(Utc::now());
    let pruned = guard.prune(Instant::now());
    if evicted > 0 || pruned > 0 {
        info!(evicted, pruned, sessions = store.len(), "sweep finished");
    }
    (evicted, pruned)
}

/// Spawn a task that sweeps every `every` until `cancel` fires.
pub fn spawn_sweeper(
    store: Arc<SessionStore>,
    guard: Arc<RedeliveryGuard>,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing is idle yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    sweep_once(&store, &guard);
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RetentionPolicy;

    fn idle_store(ttl: Duration) -> Arc<SessionStore> {
        Arc::new(SessionStore::new(RetentionPolicy {
            capacity: None,
            idle_ttl: Some(ttl),
        }))
    }

    #[test]
    fn test_sweep_once_evicts_idle_and_prunes() {
        let store = idle_store(Duration::from_millis(1));
        let guard = RedeliveryGuard::new(Duration::from_millis(1));
        drop(store.get_or_create("U1").unwrap());
        guard.first_delivery("evt-1");

        std::thread::sleep(Duration::from_millis(20));
        let (evicted, pruned) = sweep_once(&store, &guard);

        assert_eq!((evicted, pruned), (1, 1));
        assert!(store.is_empty());
        assert!(guard.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sweeper_runs_until_cancelled() {
        let store = idle_store(Duration::from_millis(1));
        let guard = Arc::new(RedeliveryGuard::new(Duration::from_secs(60)));
        drop(store.get_or_create("U1").unwrap());
        let cancel = CancellationToken::new();

        let handle = spawn_sweeper(
            Arc::clone(&store),
            guard,
            Duration::from_millis(10),
            cancel.clone(),
        );

        tokio::time::timeout(Duration::from_secs(5), async {
            while !store.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sweeper evicts the idle session");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("sweeper exits after cancel")
            .unwrap();
    }
}
