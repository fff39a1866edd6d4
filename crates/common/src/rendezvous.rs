//! Rendezvous queue: hand values from producers to consumers that may not
//! have arrived yet, and vice versa.
//!
//! Each value is delivered exactly once. A value enqueued while nobody is
//! waiting is parked until the next [`RendezvousQueue::dequeue`]; a consumer
//! that arrives first registers a waiter slot that the next
//! [`RendezvousQueue::enqueue`] fills.
//!
//! Everything lives behind a single mutex, and `dequeue` scans for a parked
//! value and registers its slot under one lock acquisition, so an `enqueue`
//! can never slip in between the two and be missed.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Returned by [`RendezvousQueue::dequeue`] when its cancellation token fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("dequeue cancelled")]
pub struct Cancelled;

struct Waiter<T> {
    id: u64,
    tx: oneshot::Sender<T>,
}

struct Inner<T> {
    /// Values enqueued while no waiter was registered
    ready: VecDeque<T>,
    /// Registered, unfulfilled waiter slots in registration order
    waiters: VecDeque<Waiter<T>>,
    next_id: u64,
}

impl<T> Inner<T> {
    /// Hand `value` to the oldest live waiter, or park it.
    fn deliver(&mut self, mut value: T, park_front: bool) {
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.tx.send(value) {
                Ok(()) => return,
                Err(returned) => value = returned,
            }
        }
        if park_front {
            self.ready.push_front(value);
        } else {
            self.ready.push_back(value);
        }
    }

    fn retract(&mut self, id: u64) -> bool {
        match self.waiters.iter().position(|w| w.id == id) {
            Some(index) => {
                self.waiters.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Multi-producer, multi-consumer rendezvous point
///
/// Cloning yields another handle to the same queue.
///
/// # Examples
///
/// ```ignore
/// let queue = RendezvousQueue::new();
/// let cancel = CancellationToken::new();
///
/// let consumer = queue.clone();
/// let handle = tokio::spawn(async move { consumer.dequeue(&cancel).await });
///
/// queue.enqueue("transfer complete");
/// assert_eq!(handle.await??, "transfer complete");
/// ```
pub struct RendezvousQueue<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for RendezvousQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for RendezvousQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RendezvousQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RendezvousQueue")
            .field("ready", &inner.ready.len())
            .field("waiting", &inner.waiters.len())
            .finish()
    }
}

impl<T> RendezvousQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                ready: VecDeque::new(),
                waiters: VecDeque::new(),
                next_id: 0,
            })),
        }
    }

    /// Deliver a value. Never blocks and never fails.
    ///
    /// If consumers are waiting, exactly one of them receives the value.
    /// Otherwise it is kept for the next `dequeue`.
    pub fn enqueue(&self, value: T) {
        self.inner.lock().deliver(value, false);
    }

    /// Take a parked value without waiting
    pub fn try_dequeue(&self) -> Option<T> {
        self.inner.lock().ready.pop_front()
    }

    /// Wait for a value
    ///
    /// Returns a parked value immediately if one exists. Otherwise registers a
    /// waiter slot and suspends until an `enqueue` fills it or `cancel` fires.
    ///
    /// On cancellation the slot is retracted before returning. If a value
    /// landed in the slot at the same moment it goes back into the queue, so
    /// a cancelled caller never consumes a value and no value is dropped.
    /// Dropping the returned future has the same effect as cancelling it.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<T, Cancelled> {
        let mut slot = {
            let mut inner = self.inner.lock();
            if let Some(value) = inner.ready.pop_front() {
                return Ok(value);
            }
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }

            let (tx, rx) = oneshot::channel();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.waiters.push_back(Waiter { id, tx });

            WaiterSlot {
                inner: &self.inner,
                id,
                rx,
                consumed: false,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::trace!(slot = slot.id, "rendezvous dequeue cancelled");
                drop(slot);
                Err(Cancelled)
            }
            received = &mut slot.rx => match received {
                Ok(value) => {
                    slot.consumed = true;
                    Ok(value)
                }
                // the sender is only dropped unsent when the queue itself is gone
                Err(_) => Err(Cancelled),
            },
        }
    }

    /// Number of parked values
    pub fn ready_len(&self) -> usize {
        self.inner.lock().ready.len()
    }

    /// Number of registered waiter slots
    pub fn waiting_len(&self) -> usize {
        self.inner.lock().waiters.len()
    }
}

/// A registered waiter. Retracts itself unless its value was consumed.
struct WaiterSlot<'a, T> {
    inner: &'a Mutex<Inner<T>>,
    id: u64,
    rx: oneshot::Receiver<T>,
    consumed: bool,
}

impl<T> Drop for WaiterSlot<'_, T> {
    fn drop(&mut self) {
        if self.consumed {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.retract(self.id) {
            return;
        }
        // An enqueue already claimed this slot. It sent while holding the lock,
        // so the value is sitting in the channel.
        if let Ok(value) = self.rx.try_recv() {
            inner.deliver(value, true);
        }
    }
}
