use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::debug;

use crate::fragment::Fragment;

/// Outcome of a bounded dequeue.
#[derive(Debug, Clone)]
pub enum Dequeued {
    /// A fragment was available within the bound.
    Fragment(Fragment),
    /// The bound elapsed with nothing queued. Not an error.
    Expired,
    /// The producer hung up and every queued fragment has been drained.
    Disconnected,
}

/// Hand-off queue between the receive loop and the reading caller.
///
/// Single producer, single consumer. Fragments are stamped on `put`, in the
/// producer thread, so receipt order and receipt times survive the crossing.
/// `get` waits at most the given bound and reports expiry as a value rather
/// than blocking forever.
pub struct TimedQueue {
    state: Mutex<State>,
    available: Condvar,
}

struct State {
    fragments: VecDeque<Fragment>,
    disconnected: bool,
}

impl TimedQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                fragments: VecDeque::new(),
                disconnected: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Append a payload, stamped with the current time, and wake the consumer.
    ///
    /// Ignored after [`disconnect`](Self::disconnect); the producer is the
    /// one hanging up, so nothing can legitimately arrive afterwards.
    pub fn put(&self, payload: impl Into<Bytes>) {
        let fragment = Fragment::new(payload);
        let mut state = self.lock();
        if state.disconnected {
            return;
        }
        state.fragments.push_back(fragment);
        drop(state);
        self.available.notify_one();
    }

    /// Wait up to `bound` for the next fragment (`None` waits indefinitely).
    /// A bound too large to land on a representable deadline also waits
    /// indefinitely.
    ///
    /// Queued fragments are always delivered before a disconnect is reported,
    /// so the consumer never loses data that made it across.
    pub fn get(&self, bound: Option<Duration>) -> Dequeued {
        let deadline = bound.and_then(|b| Instant::now().checked_add(b));
        let mut state = self.lock();
        loop {
            if let Some(fragment) = state.fragments.pop_front() {
                return Dequeued::Fragment(fragment);
            }
            if state.disconnected {
                return Dequeued::Disconnected;
            }
            state = match deadline {
                None => self
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Dequeued::Expired;
                    }
                    self.available
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Discard everything currently queued.
    pub fn clear(&self) {
        let mut state = self.lock();
        let dropped = state.fragments.len();
        state.fragments.clear();
        if dropped > 0 {
            debug!(fragments = dropped, "cleared receive queue");
        }
    }

    /// Producer-side hang-up. Wakes a blocked consumer.
    pub fn disconnect(&self) {
        let mut state = self.lock();
        state.disconnected = true;
        drop(state);
        self.available.notify_all();
        debug!("receive queue disconnected");
    }

    /// Number of fragments currently queued.
    pub fn len(&self) -> usize {
        self.lock().fragments.len()
    }

    /// Whether the queue is currently empty.
    pub fn is_empty(&self) -> bool {
        self.lock().fragments.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TimedQueue {
    fn default() -> Self {
        Self::new()
    }
}
