//! Dispatcher: runs one exchange per inbound message in the background.
//!
//! `dispatch` is synchronous and never waits on the network, so the webhook
//! handler can acknowledge immediately. Behind it:
//!
//! - **Admission**: a semaphore of `max_pending_exchanges` permits. A message
//!   that cannot get a permit is answered with the busy reply instead.
//!   Busy replies take a permit from a second semaphore of
//!   `max_busy_replies`; when that is exhausted too, the reply is dropped and
//!   reported to the failure hook. A busy reply for a user with a running
//!   lane joins the back of that lane so it arrives after earlier replies.
//! - **Per-user lanes**: a FIFO queue per user id. The lane exists exactly
//!   while one drain task is running for that user, so a user's exchanges run
//!   one at a time in receive order. Different users run in parallel.
//! - **Workers**: a semaphore of `max_concurrent_exchanges` permits bounds how
//!   many exchanges talk to the model at once.
//! - **Delivery**: every exchange ends with exactly one push (the reply or a
//!   formatted error), bounded by a timeout, with optional retries and a
//!   failure hook.
//!
//! All tasks are spawned on a `TaskTracker` so shutdown can wait for
//! in-flight exchanges.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use courier_types::config::RelayConfig;
use courier_types::error::{DeliveryError, DispatchError};
use courier_types::exchange::Exchange;
use courier_types::llm::{ClientError, GenerationOptions};

use crate::delivery::{DeliveryFailureHook, LogDeliveryFailure, OutboundNotifier};
use crate::llm::{ConversationClient, GenerativeModel};
use crate::session::SessionStore;

use super::command::{Command, RESET_REPLY, parse_command};

/// Tunables for a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub options: GenerationOptions,
    pub max_concurrent_exchanges: usize,
    pub max_pending_exchanges: usize,
    pub max_busy_replies: usize,
    pub push_timeout: Duration,
    pub push_retries: u32,
    pub push_retry_backoff: Duration,
    pub error_reply_prefix: String,
    pub busy_reply: String,
}

impl DispatchSettings {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            options: config.generation_options(),
            max_concurrent_exchanges: config.max_concurrent_exchanges,
            max_pending_exchanges: config.max_pending_exchanges,
            max_busy_replies: config.max_busy_replies,
            push_timeout: config.push_timeout(),
            push_retries: config.push_retries,
            push_retry_backoff: config.push_retry_backoff(),
            error_reply_prefix: config.error_reply_prefix.clone(),
            busy_reply: config.busy_reply.clone(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default())
    }
}

/// Returned by a successful [`Dispatcher::dispatch`]. Carries no result:
/// the outcome only ever reaches the user through the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReceipt {
    pub exchange_id: Uuid,
}

/// Point-in-time load figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Background tasks still running (lanes plus busy replies). Bounded by
    /// `max_pending_exchanges + max_busy_replies`.
    pub in_flight_tasks: usize,
    /// Accepted exchanges not yet delivered.
    pub pending_exchanges: usize,
    /// Users with a lane currently draining.
    pub active_lanes: usize,
}

/// Delay before retry number `attempt`, growing linearly with the attempt.
pub fn retry_delay(backoff: Duration, attempt: u32) -> Duration {
    backoff.checked_mul(attempt).unwrap_or(Duration::MAX)
}

/// Build the user-visible reply for a failed model call.
pub fn format_error_reply(prefix: &str, error: &ClientError) -> String {
    format!("{prefix}: {error}")
}

/// A lane entry. The permit is an admission permit for model exchanges and a
/// busy-reply permit for pre-failed busy exchanges.
struct QueuedExchange {
    exchange: Exchange,
    _permit: OwnedSemaphorePermit,
}

type Lanes = DashMap<String, VecDeque<QueuedExchange>>;

/// Closes a lane whose drain task ended without emptying it (a panic or an
/// aborted task), releasing the permits of everything still queued.
struct LaneGuard<'a> {
    lanes: &'a Lanes,
    user_id: &'a str,
    drained: bool,
}

impl Drop for LaneGuard<'_> {
    fn drop(&mut self) {
        if self.drained {
            return;
        }
        if let Some((_, queued)) = self.lanes.remove(self.user_id) {
            error!(
                user_id = self.user_id,
                dropped = queued.len(),
                "lane aborted, dropping queued exchanges"
            );
        }
    }
}

struct DispatcherInner<M: GenerativeModel, N: OutboundNotifier> {
    store: Arc<SessionStore>,
    client: ConversationClient<M>,
    notifier: N,
    failure_hook: Arc<dyn DeliveryFailureHook>,
    settings: DispatchSettings,
    lanes: Lanes,
    workers: Semaphore,
    admission: Arc<Semaphore>,
    busy: Arc<Semaphore>,
    tracker: TaskTracker,
}

/// Schedules exchanges onto per-user lanes. Cheap to clone.
pub struct Dispatcher<M: GenerativeModel, N: OutboundNotifier> {
    inner: Arc<DispatcherInner<M, N>>,
}

impl<M: GenerativeModel, N: OutboundNotifier> Clone for Dispatcher<M, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M, N> Dispatcher<M, N>
where
    M: GenerativeModel + 'static,
    N: OutboundNotifier + 'static,
{
    /// Create a dispatcher whose delivery failures are only logged.
    pub fn new(
        store: Arc<SessionStore>,
        client: ConversationClient<M>,
        notifier: N,
        settings: DispatchSettings,
    ) -> Self {
        Self::with_failure_hook(store, client, notifier, settings, Arc::new(LogDeliveryFailure))
    }

    /// Create a dispatcher with a custom delivery-failure hook.
    pub fn with_failure_hook(
        store: Arc<SessionStore>,
        client: ConversationClient<M>,
        notifier: N,
        mut settings: DispatchSettings,
        failure_hook: Arc<dyn DeliveryFailureHook>,
    ) -> Self {
        settings.max_concurrent_exchanges = settings.max_concurrent_exchanges.max(1);
        settings.max_pending_exchanges = settings
            .max_pending_exchanges
            .max(settings.max_concurrent_exchanges);
        settings.max_busy_replies = settings.max_busy_replies.max(1);

        Self {
            inner: Arc::new(DispatcherInner {
                store,
                client,
                notifier,
                failure_hook,
                workers: Semaphore::new(settings.max_concurrent_exchanges),
                admission: Arc::new(Semaphore::new(settings.max_pending_exchanges)),
                busy: Arc::new(Semaphore::new(settings.max_busy_replies)),
                settings,
                lanes: DashMap::new(),
                tracker: TaskTracker::new(),
            }),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    pub fn client(&self) -> &ConversationClient<M> {
        &self.inner.client
    }

    pub fn notifier(&self) -> &N {
        &self.inner.notifier
    }

    /// Accept one inbound message and schedule its exchange.
    ///
    /// Never blocks. When the dispatcher is saturated the user is answered
    /// with the busy reply (capacity permitting) and `Overloaded` is
    /// returned.
    pub fn dispatch(&self, user_id: &str, text: &str) -> Result<DispatchReceipt, DispatchError> {
        if user_id.is_empty() {
            return Err(DispatchError::EmptyUserId);
        }
        let inner = &self.inner;
        if inner.tracker.is_closed() {
            return Err(DispatchError::ShuttingDown);
        }

        let mut exchange = Exchange::received(user_id, text);
        let exchange_id = exchange.id;

        let Ok(admission) = Arc::clone(&inner.admission).try_acquire_owned() else {
            let pending = inner.settings.max_pending_exchanges;
            warn!(%exchange_id, user_id, pending, "dispatcher saturated, sending busy reply");
            exchange.mark_dispatched();
            exchange.fail(inner.settings.busy_reply.clone());
            inner.reply_busy(exchange);
            return Err(DispatchError::Overloaded { pending });
        };

        exchange.mark_dispatched();
        let queued = QueuedExchange {
            exchange,
            _permit: admission,
        };

        let lane_head = match inner.lanes.entry(user_id.to_string()) {
            Entry::Occupied(mut lane) => {
                lane.get_mut().push_back(queued);
                None
            }
            Entry::Vacant(lane) => {
                lane.insert(VecDeque::new());
                Some(queued)
            }
        };

        match lane_head {
            Some(first) => {
                let task_inner = Arc::clone(inner);
                let user_id = user_id.to_string();
                inner
                    .tracker
                    .spawn(async move { task_inner.drain_lane(user_id, first).await });
                debug!(%exchange_id, "started lane");
            }
            None => debug!(%exchange_id, "queued behind earlier exchange"),
        }

        Ok(DispatchReceipt { exchange_id })
    }

    pub fn stats(&self) -> DispatchStats {
        let inner = &self.inner;
        DispatchStats {
            in_flight_tasks: inner.tracker.len(),
            pending_exchanges: inner
                .settings
                .max_pending_exchanges
                .saturating_sub(inner.admission.available_permits()),
            active_lanes: inner.lanes.len(),
        }
    }

    /// Stop accepting exchanges and wait for in-flight ones to be delivered.
    pub async fn shutdown(&self) {
        self.inner.tracker.close();
        info!(
            in_flight = self.inner.tracker.len(),
            "waiting for in-flight exchanges"
        );
        self.inner.tracker.wait().await;
    }
}

impl<M, N> DispatcherInner<M, N>
where
    M: GenerativeModel + 'static,
    N: OutboundNotifier + 'static,
{
    /// Send the busy reply for a rejected exchange without blocking.
    fn reply_busy(self: &Arc<Self>, exchange: Exchange) {
        let Ok(permit) = Arc::clone(&self.busy).try_acquire_owned() else {
            let limit = self.settings.max_busy_replies;
            debug!(exchange_id = %exchange.id, limit, "busy reply limit reached");
            self.failure_hook.on_delivery_failure(
                &exchange,
                &DeliveryError::Dropped(format!("{limit} busy replies already in flight")),
                0,
            );
            return;
        };
        let queued = QueuedExchange {
            exchange,
            _permit: permit,
        };

        let user_id = queued.exchange.user_id.clone();
        match self.lanes.get_mut(&user_id) {
            Some(mut lane) => lane.push_back(queued),
            None => {
                let task_inner = Arc::clone(self);
                self.tracker.spawn(async move {
                    task_inner.deliver(&queued.exchange).await;
                });
            }
        }
    }

    async fn drain_lane(&self, user_id: String, first: QueuedExchange) {
        let mut guard = LaneGuard {
            lanes: &self.lanes,
            user_id: &user_id,
            drained: false,
        };
        let mut next = Some(first);
        while let Some(queued) = next {
            self.run_exchange(queued).await;
            next = self.pop_lane(&user_id);
        }
        guard.drained = true;
    }

    /// Take the next queued exchange, or close the lane if it is empty.
    fn pop_lane(&self, user_id: &str) -> Option<QueuedExchange> {
        match self.lanes.entry(user_id.to_string()) {
            Entry::Occupied(mut lane) => {
                let next = lane.get_mut().pop_front();
                if next.is_none() {
                    lane.remove();
                }
                next
            }
            Entry::Vacant(_) => None,
        }
    }

    async fn run_exchange(&self, queued: QueuedExchange) {
        let QueuedExchange {
            mut exchange,
            _permit,
        } = queued;
        if exchange.state().is_terminal() {
            self.deliver(&exchange).await;
            return;
        }

        let span = info_span!(
            "exchange",
            exchange_id = %exchange.id,
            user_id = %exchange.user_id,
        );

        async {
            let _worker = self.workers.acquire().await.ok();

            match parse_command(&exchange.input_text) {
                Some(Command::Reset) => {
                    self.store.remove(&exchange.user_id);
                    exchange.complete(RESET_REPLY);
                }
                None => match self.converse(&exchange).await {
                    Ok(reply) => exchange.complete(reply),
                    Err(e) => {
                        warn!(error = %e, "model call failed, sending error reply");
                        exchange.fail(format_error_reply(&self.settings.error_reply_prefix, &e));
                    }
                },
            }

            self.deliver(&exchange).await;
        }
        .instrument(span)
        .await;
    }

    async fn converse(&self, exchange: &Exchange) -> Result<String, ClientError> {
        let handle = self
            .store
            .get_or_create(&exchange.user_id)
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        let mut session = handle.lock().await;
        self.client
            .send(&mut session, &exchange.input_text, &self.settings.options)
            .await
    }

    /// Push the exchange's reply, retrying retryable failures.
    async fn deliver(&self, exchange: &Exchange) -> bool {
        let Some(text) = exchange.reply_text() else {
            warn!(exchange_id = %exchange.id, "exchange has no reply to deliver");
            return false;
        };
        let timeout = self.settings.push_timeout;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let result =
                match tokio::time::timeout(timeout, self.notifier.push(&exchange.user_id, text))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(DeliveryError::Timeout(timeout)),
                };

            match result {
                Ok(()) => {
                    info!(
                        exchange_id = %exchange.id,
                        user_id = %exchange.user_id,
                        state = %exchange.state(),
                        channel = self.notifier.name(),
                        attempts = attempt,
                        "reply delivered"
                    );
                    return true;
                }
                Err(e) if e.is_retryable() && attempt <= self.settings.push_retries => {
                    warn!(
                        exchange_id = %exchange.id,
                        attempt,
                        error = %e,
                        "push failed, retrying"
                    );
                    tokio::time::sleep(retry_delay(self.settings.push_retry_backoff, attempt)).await;
                }
                Err(e) => {
                    self.failure_hook.on_delivery_failure(exchange, &e, attempt);
                    return false;
                }
            }
        }
    }
}
