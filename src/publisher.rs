// Publisher: hands the latest composite snapshot to subscribers (latest value wins, no queueing)

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::CompositeSnapshot;

pub type SubscriptionId = u64;

type Latest = Option<Arc<CompositeSnapshot>>;

struct PublisherInner {
    latest: watch::Sender<Latest>,
    subscribers: Mutex<HashMap<SubscriptionId, JoinHandle<()>>>,
    next_id: AtomicU64,
    published_total: AtomicU64,
}

/// Delivers each published snapshot to every current subscriber.
///
/// Every subscriber runs in its own task fed by a watch channel: one that falls
/// behind skips straight to the newest snapshot, and it never delays `publish`
/// or other subscribers. Handler errors and panics are logged and swallowed.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

impl Default for Publisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Publisher {
    pub fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            inner: Arc::new(PublisherInner {
                latest,
                subscribers: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                published_total: AtomicU64::new(0),
            }),
        }
    }

    /// Register `handler`; it receives every snapshot published from now on
    /// that it is not too slow to see. Must be called within a Tokio runtime.
    ///
    /// `handler` runs on a runtime worker and should not block for long.
    pub fn subscribe<F>(&self, mut handler: F) -> SubscriptionId
    where
        F: FnMut(Arc<CompositeSnapshot>) -> anyhow::Result<()> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut rx = self.inner.latest.subscribe();
        let handle = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let Some(snapshot) = rx.borrow_and_update().clone() else {
                    continue;
                };
                match std::panic::catch_unwind(AssertUnwindSafe(|| handler(snapshot))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        tracing::warn!(subscription = id, error = %e, "subscriber failed");
                    }
                    Err(_) => {
                        tracing::error!(subscription = id, "subscriber panicked");
                    }
                }
            }
            tracing::debug!(subscription = id, "subscriber task exiting");
        });
        match self.inner.subscribers.lock() {
            Ok(mut subs) => {
                subs.insert(id, handle);
            }
            Err(e) => {
                e.into_inner().insert(id, handle);
            }
        }
        tracing::debug!(subscription = id, "subscriber added");
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = match self.inner.subscribers.lock() {
            Ok(mut subs) => subs.remove(&id),
            Err(e) => e.into_inner().remove(&id),
        };
        match removed {
            Some(handle) => {
                handle.abort();
                tracing::debug!(subscription = id, "subscriber removed");
                true
            }
            None => false,
        }
    }

    /// Make `snapshot` the latest value and wake all subscribers.
    pub fn publish(&self, snapshot: Arc<CompositeSnapshot>) {
        self.inner.latest.send_replace(Some(snapshot));
        self.inner.published_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Most recently published snapshot, `None` before the first publish.
    pub fn latest(&self) -> Option<Arc<CompositeSnapshot>> {
        self.inner.latest.borrow().clone()
    }

    /// Receiver for async consumers that prefer to pull.
    pub fn watch(&self) -> watch::Receiver<Latest> {
        self.inner.latest.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        match self.inner.subscribers.lock() {
            Ok(subs) => subs.len(),
            Err(e) => e.into_inner().len(),
        }
    }

    pub fn published_total(&self) -> u64 {
        self.inner.published_total.load(Ordering::Relaxed)
    }
}

impl Drop for PublisherInner {
    fn drop(&mut self) {
        let subs = match self.subscribers.get_mut() {
            Ok(subs) => subs,
            Err(e) => e.into_inner(),
        };
        for (_, handle) in subs.drain() {
            handle.abort();
        }
    }
}
