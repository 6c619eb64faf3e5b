// Implements an unbounded blocking FIFO queue usable across threads.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

/// `SharedQueue` is how a [`BlockingQueue`] gets handed to the
/// threads producing into and consuming from it.
pub type SharedQueue<T> = Arc<BlockingQueue<T>>;

/// `BlockingQueue` is an unbounded first-in-first-out queue where
/// [`BlockingQueue::push`] never waits and [`BlockingQueue::pop`]
/// sleeps the calling thread on a `Condvar` until an item arrives.
///
/// A single wait predicate exists ("the queue is non-empty") so a
/// single condition variable suffices; there is no "not full" side
/// since the queue is never bounded.
///
/// Items only need to be `Send` to cross threads, move-only payloads
/// are handed over without copies.
///
/// # Examples
///
/// ```
/// use foundation_handoff::synca::BlockingQueue;
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BlockingQueue::new());
///
/// let producer_queue = Arc::clone(&queue);
/// let producer = thread::spawn(move || {
///     for i in 0..3 {
///         producer_queue.push(i);
///     }
/// });
///
/// assert_eq!(queue.pop(), 0);
/// assert_eq!(queue.pop(), 1);
/// assert_eq!(queue.pop(), 2);
///
/// producer.join().unwrap();
/// ```
pub struct BlockingQueue<T> {
    /// The items awaiting a consumer, front is the oldest.
    items: Mutex<VecDeque<T>>,

    /// Signaled whenever an item is appended.
    not_empty: Condvar,
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> core::fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("len", &self.len())
            .finish()
    }
}

impl<T> BlockingQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            not_empty: Condvar::new(),
        }
    }

    /// A panic in another holder of the lock leaves the `VecDeque`
    /// itself intact, so a poisoned lock is taken over as is.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        match self.items.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Appends `item` to the back of the queue and wakes one thread
    /// blocked in [`Self::pop`], if any.
    pub fn push(&self, item: T) {
        let mut items = self.lock();
        items.push_back(item);
        drop(items);

        self.not_empty.notify_one();
    }

    /// Removes and returns the front item, blocking the current thread
    /// until one is available.
    ///
    /// There is no timeout: with no producer left this waits forever.
    pub fn pop(&self) -> T {
        let mut items = self.lock();
        loop {
            // re-checked after every wakeup, spurious or stolen.
            if let Some(item) = items.pop_front() {
                return item;
            }

            items = match self.not_empty.wait(items) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Same as [`Self::pop`] but writes the item into `out`.
    pub fn pop_into(&self, out: &mut T) {
        *out = self.pop();
    }

    /// `try_pop` returns the front item if one is queued
    /// without ever blocking.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
