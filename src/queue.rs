//! Unbounded FIFO handoff queues
//!
//! `EventQueue<T>` is the only shared mutable state in the pipeline. The
//! emitter pushes to the inbound queue, the evaluator pops from it and pushes
//! to the outbound queue, and the dashboard takes snapshots of both.
//!
//! ## Semantics
//!
//! - Unbounded: `push` never blocks and never fails for capacity reasons
//! - FIFO: `pop`/`try_pop` always return the oldest element
//! - `snapshot` copies the current contents without removing anything. It is
//!   eventually consistent with concurrent pops: two consecutive snapshots may
//!   disagree if the evaluator popped in between.
//!
//! The lock is a plain `std::sync::Mutex` and is never held across an
//! `.await`; waiting for data goes through `tokio::sync::Notify`, so an idle
//! consumer yields to the runtime instead of spinning.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};
use tokio::sync::Notify;

struct Inner<T> {
    items: Mutex<VecDeque<T>>,
    notify: Notify,
}

/// Cloneable handle to a shared unbounded FIFO queue
pub struct EventQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for EventQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                items: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
            }),
        }
    }

    // Elements are plain values, so a panic in another holder cannot leave
    // the deque half-updated; recover the guard instead of propagating.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.inner
            .items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append to the back of the queue
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
        self.inner.notify.notify_one();
    }

    /// Remove the oldest element, if any
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Remove the oldest element, waiting until one is available
    ///
    /// Cancel-safe: if the future is dropped before it resolves, no element
    /// is lost.
    pub async fn pop(&self) -> T {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(item) = self.try_pop() {
                return item;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T: Clone> EventQueue<T> {
    /// Copy of the current contents, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.lock().iter().cloned().collect()
    }

    /// Copy of the newest `n` elements, newest first
    pub fn latest(&self, n: usize) -> Vec<T> {
        self.lock().iter().rev().take(n).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let queue = EventQueue::new();
        for i in 0..5 {
            queue.push(i);
        }

        let popped: Vec<i32> = std::iter::from_fn(|| queue.try_pop()).collect();
        assert_eq!(popped, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_snapshot_is_non_destructive() {
        let queue = EventQueue::new();
        queue.push("a");
        queue.push("b");

        assert_eq!(queue.snapshot(), vec!["a", "b"]);
        assert_eq!(queue.snapshot(), vec!["a", "b"]);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.latest(1), vec!["b"]);
    }

    #[test]
    fn test_clones_share_storage() {
        let producer = EventQueue::new();
        let consumer = producer.clone();

        producer.push(1u8);
        assert_eq!(consumer.try_pop(), Some(1));
        assert_eq!(producer.try_pop(), None);
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = EventQueue::new();
        let producer = queue.clone();

        let waiter = tokio::spawn(async move { queue.pop().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        producer.push(99u32);
        let value = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("pop should resolve after push")
            .unwrap();
        assert_eq!(value, 99);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_push_pop_preserves_order() {
        let queue = EventQueue::new();
        let producer = queue.clone();
        let observer = queue.clone();

        let push_task = tokio::spawn(async move {
            for i in 0..1_000u32 {
                producer.push(i);
                if i % 64 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        });

        // Snapshots taken mid-flight must always be strictly increasing
        let snapshot_task = tokio::spawn(async move {
            for _ in 0..50 {
                let snap = observer.snapshot();
                assert!(snap.windows(2).all(|w| w[0] < w[1]));
                tokio::task::yield_now().await;
            }
        });

        let mut received = Vec::with_capacity(1_000);
        while received.len() < 1_000 {
            received.push(queue.pop().await);
        }

        push_task.await.unwrap();
        snapshot_task.await.unwrap();
        assert_eq!(received, (0..1_000).collect::<Vec<_>>());
    }
}
