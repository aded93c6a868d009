use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

struct Listener<K, T> {
    key: K,
    sender: mpsc::UnboundedSender<T>,
}

type Listeners<K, T> = Arc<Mutex<HashMap<u64, Listener<K, T>>>>;

/// Live queries of one shape, keyed by their filter value.
pub struct LiveRegistry<K, T> {
    listeners: Listeners<K, T>,
    next_id: AtomicU64,
}

impl<K, T> Default for LiveRegistry<K, T> {
    fn default() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<K, T> LiveRegistry<K, T>
where
    K: Clone + PartialEq + Send + 'static,
    T: Clone + Send + 'static,
{
    /// Registers a listener and queues `initial` as its first snapshot.
    pub fn register(&self, key: K, initial: T) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(initial);
        self.listeners.lock().insert(id, Listener { key, sender });

        let listeners = Arc::downgrade(&self.listeners);
        Subscription {
            receiver,
            cancel: Some(Box::new(move || {
                if let Some(listeners) = listeners.upgrade() {
                    listeners.lock().remove(&id);
                }
            })),
        }
    }

    /// Distinct keys with at least one live listener.
    pub fn active_keys(&self) -> Vec<K> {
        let listeners = self.listeners.lock();
        let mut keys: Vec<K> = Vec::new();
        for listener in listeners.values() {
            if !keys.contains(&listener.key) {
                keys.push(listener.key.clone());
            }
        }
        keys
    }

    pub fn has_listeners(&self, key: &K) -> bool {
        self.listeners
            .lock()
            .values()
            .any(|listener| &listener.key == key)
    }

    /// Delivers `snapshot` to every listener on `key`, pruning closed ones.
    pub fn publish(&self, key: &K, snapshot: T) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|_, listener| {
            if &listener.key != key {
                return true;
            }
            listener.sender.send(snapshot.clone()).is_ok()
        });
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Live query handle. Dropping or cancelling it stops delivery.
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl<T> Subscription<T> {
    /// Waits for the next snapshot. Snapshots are full materializations, so
    /// a backlog collapses to its newest entry.
    pub async fn next(&mut self) -> Option<T> {
        let mut latest = self.receiver.recv().await?;
        while let Ok(newer) = self.receiver.try_recv() {
            latest = newer;
        }
        Some(latest)
    }

    /// Newest queued snapshot without waiting.
    pub fn try_next(&mut self) -> Option<T> {
        let mut latest = None;
        while let Ok(snapshot) = self.receiver.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }

    pub fn cancel(self) {
        drop(self);
    }

    fn unregister(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.receiver.close();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.cancel.is_none())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn initial_snapshot_is_delivered() {
        let registry: LiveRegistry<&'static str, u32> = LiveRegistry::default();
        let mut sub = registry.register("a", 7);
        assert_eq!(sub.next().await, Some(7));
    }

    #[tokio::test]
    async fn publish_reaches_only_matching_key() {
        let registry: LiveRegistry<&'static str, u32> = LiveRegistry::default();
        let mut a = registry.register("a", 0);
        let mut b = registry.register("b", 0);
        a.try_next();
        b.try_next();

        registry.publish(&"a", 1);
        assert_eq!(a.try_next(), Some(1));
        assert_eq!(b.try_next(), None);
    }

    #[tokio::test]
    async fn backlog_collapses_to_latest() {
        let registry: LiveRegistry<&'static str, u32> = LiveRegistry::default();
        let mut sub = registry.register("a", 0);
        registry.publish(&"a", 1);
        registry.publish(&"a", 2);
        assert_eq!(sub.next().await, Some(2));
    }

    #[test]
    fn cancel_unregisters() {
        let registry: LiveRegistry<&'static str, u32> = LiveRegistry::default();
        let sub = registry.register("a", 0);
        let other = registry.register("a", 0);
        assert_eq!(registry.len(), 2);

        sub.cancel();
        assert_eq!(registry.len(), 1);
        drop(other);
        assert!(registry.is_empty());
        assert!(!registry.has_listeners(&"a"));
    }
}
