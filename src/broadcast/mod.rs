//! # Broadcast Module
//!
//! Fan-out of published telemetry to live subscribers, plus the latest-state
//! cell that serves one-shot snapshot queries.
//!
//! Every subscriber owns a bounded queue. Publishing never waits: when a
//! subscriber's queue is full the event is discarded for that subscriber only,
//! and a subscriber whose receiver was dropped is pruned on the next publish.
//! Events reach each subscriber in publication order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use crate::telemetry::{HistoryEntry, LatestState, Sample};

/// Default per-subscriber queue depth
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 32;

/// Identifier of one subscriber registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receiving end of a subscription
///
/// Yields events published after [`BroadcastHub::subscribe`] returned.
/// `recv` returns `None` once the subscription was removed or the hub closed.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<LatestState>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event
    pub async fn recv(&mut self) -> Option<Arc<LatestState>> {
        self.receiver.recv().await
    }

    /// Take the next event if one is already queued
    pub fn try_recv(&mut self) -> Option<Arc<LatestState>> {
        self.receiver.try_recv().ok()
    }
}

/// Publish/subscribe hub for telemetry events
///
/// Shared behind an `Arc` between the link task (the only publisher) and any
/// number of readers.
#[derive(Debug)]
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<LatestState>>>>,
    latest: watch::Sender<Arc<LatestState>>,
    next_id: AtomicU64,
    buffer_size: usize,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl BroadcastHub {
    /// Create a hub whose subscribers queue up to `buffer_size` events
    pub fn new(buffer_size: usize) -> Self {
        let (latest, _) = watch::channel(Arc::new(LatestState::initial(Utc::now())));
        Self {
            subscribers: Mutex::new(HashMap::new()),
            latest,
            next_id: AtomicU64::new(1),
            buffer_size: buffer_size.max(1),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a new subscriber
    ///
    /// No backfill: the first event received is the next one published.
    /// Use [`read_latest`](Self::read_latest) for the current state.
    /// After [`close`](Self::close) the subscription is already ended.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.buffer_size);

        let mut subscribers = self.registry();
        if self.closed.load(Ordering::Acquire) {
            debug!("Subscriber {} refused, hub is closed", id);
            return Subscription { id, receiver };
        }
        subscribers.insert(id, sender);
        drop(subscribers);

        debug!("Subscriber {} registered", id);
        Subscription { id, receiver }
    }

    /// Remove a subscriber registration
    ///
    /// Returns `false` if it was already gone. Calling it twice is harmless.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry().remove(&id).is_some();
        if removed {
            debug!("Subscriber {} removed", id);
        }
        removed
    }

    /// Replace the latest state and deliver it to every subscriber
    ///
    /// Never blocks. Returns the published event.
    pub fn publish(&self, current: Sample, history: Arc<[HistoryEntry]>) -> Arc<LatestState> {
        let event = Arc::new(LatestState { current, history });
        self.latest.send_replace(Arc::clone(&event));

        self.registry().retain(|id, sender| match sender.try_send(Arc::clone(&event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Subscriber {} is lagging, event discarded", id);
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Subscriber {} went away", id);
                false
            }
        });

        event
    }

    /// Current state for one-shot queries
    ///
    /// Before the first publish this is a zeroed sample with empty history.
    pub fn read_latest(&self) -> Arc<LatestState> {
        Arc::clone(&self.latest.borrow())
    }

    /// Watch handle that is notified whenever the latest state changes
    pub fn watch_latest(&self) -> watch::Receiver<Arc<LatestState>> {
        self.latest.subscribe()
    }

    /// Release every subscriber registration
    ///
    /// Open subscriptions observe end of stream once their queue drains.
    /// Later subscriptions end immediately.
    pub fn close(&self) {
        let mut subscribers = self.registry();
        self.closed.store(true, Ordering::Release);
        if !subscribers.is_empty() {
            info!("Releasing {} subscribers", subscribers.len());
        }
        subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    /// Total events discarded for lagging subscribers
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Arc<LatestState>>>> {
        // The map stays consistent even if a holder panicked
        self.subscribers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::validate_frame;

    fn sample(distance: f64) -> Sample {
        let mut sample = validate_frame("0,22.0,55.0,37.77,-122.41,10.0,1,1").unwrap();
        sample.distance = distance;
        sample
    }

    fn no_history() -> Arc<[HistoryEntry]> {
        Arc::from(Vec::new())
    }

    #[test]
    fn test_read_latest_before_publish() {
        let hub = BroadcastHub::default();
        let latest = hub.read_latest();

        assert_eq!(latest.current.distance, 0.0);
        assert_eq!(latest.current.temperature, 0.0);
        assert_eq!(latest.current.latitude, 0.0);
        assert!(!latest.current.gps_fix);
        assert!(!latest.current.heartbeat);
        assert!(latest.history.is_empty());
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let hub = BroadcastHub::default();
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        hub.publish(sample(1.0), no_history());

        assert_eq!(a.try_recv().unwrap().current.distance, 1.0);
        assert_eq!(b.try_recv().unwrap().current.distance, 1.0);
        assert!(a.try_recv().is_none());
    }

    #[test]
    fn test_late_subscriber_gets_no_backfill() {
        let hub = BroadcastHub::default();
        let mut fixes = Vec::new();
        for k in 1..=3 {
            let current = sample(k as f64);
            fixes.extend(current.history_entry());
            hub.publish(current, Arc::from(fixes.clone()));
        }

        let mut late = hub.subscribe();
        assert!(late.try_recv().is_none(), "no backfill expected");

        let latest = hub.read_latest();
        assert_eq!(latest.current.distance, 3.0);
        assert_eq!(latest.history.len(), 3);
        assert_eq!(&latest.history[..], &fixes[..]);

        hub.publish(sample(4.0), no_history());
        assert_eq!(late.try_recv().unwrap().current.distance, 4.0);
    }

    #[test]
    fn test_events_arrive_in_order() {
        let hub = BroadcastHub::new(16);
        let mut sub = hub.subscribe();
        for k in 0..10 {
            hub.publish(sample(k as f64), no_history());
        }
        for k in 0..10 {
            assert_eq!(sub.try_recv().unwrap().current.distance, k as f64);
        }
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let hub = BroadcastHub::default();
        let mut sub = hub.subscribe();
        let id = sub.id();

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.subscriber_count(), 0);

        hub.publish(sample(1.0), no_history());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn test_lagging_subscriber_does_not_block_others() {
        let hub = BroadcastHub::new(2);
        let mut slow = hub.subscribe();
        let mut fast = hub.subscribe();

        for k in 0..5 {
            hub.publish(sample(k as f64), no_history());
            assert_eq!(fast.try_recv().unwrap().current.distance, k as f64);
        }

        // Slow subscriber kept the first two, the rest were discarded
        assert_eq!(slow.try_recv().unwrap().current.distance, 0.0);
        assert_eq!(slow.try_recv().unwrap().current.distance, 1.0);
        assert!(slow.try_recv().is_none());
        assert_eq!(hub.dropped_events(), 3);
        assert_eq!(hub.subscriber_count(), 2);
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let hub = BroadcastHub::default();
        let sub = hub.subscribe();
        let _kept = hub.subscribe();
        drop(sub);

        hub.publish(sample(1.0), no_history());
        assert_eq!(hub.subscriber_count(), 1);
    }

    #[test]
    fn test_close_ends_subscriptions() {
        let hub = BroadcastHub::default();
        let mut sub = hub.subscribe();
        hub.publish(sample(1.0), no_history());
        hub.close();

        assert_eq!(hub.subscriber_count(), 0);
        let received = tokio_test::block_on(async {
            let first = sub.recv().await;
            let end = sub.recv().await;
            (first, end)
        });
        assert_eq!(received.0.unwrap().current.distance, 1.0);
        assert!(received.1.is_none());
    }

    #[test]
    fn test_subscribe_after_close_ends_immediately() {
        let hub = BroadcastHub::default();
        hub.close();
        assert!(hub.is_closed());

        let mut sub = hub.subscribe();
        hub.publish(sample(1.0), no_history());

        assert_eq!(hub.subscriber_count(), 0);
        assert!(sub.try_recv().is_none());
        assert!(tokio_test::block_on(sub.recv()).is_none());
        assert_eq!(hub.read_latest().current.distance, 1.0);
    }

    #[tokio::test]
    async fn test_subscriber_on_another_task() {
        let hub = Arc::new(BroadcastHub::default());
        let mut sub = hub.subscribe();

        let reader = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(event) = sub.recv().await {
                seen.push(event.current.distance);
            }
            seen
        });

        for k in 0..3 {
            hub.publish(sample(k as f64), no_history());
        }
        hub.close();

        assert_eq!(reader.await.unwrap(), vec![0.0, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_watch_latest_sees_publish() {
        let hub = BroadcastHub::default();
        let mut watcher = hub.watch_latest();

        hub.publish(sample(7.0), no_history());
        watcher.changed().await.unwrap();
        assert_eq!(watcher.borrow().current.distance, 7.0);
    }
}
