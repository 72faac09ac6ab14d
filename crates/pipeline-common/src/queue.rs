//! # Work Queue
//!
//! An unbounded, arrival-ordered queue shared by one producer stage and one or
//! more consumer stages of a single pipeline run.
//!
//! The completion protocol is explicit: the producer side calls
//! [`WorkQueue::mark_complete`] exactly once when nothing more will be
//! enqueued. Consumers then drain the remaining items and observe `None`
//! from [`WorkQueue::dequeue`], which stays `None` on every later call.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::trace;

/// Violations of the queue's completion protocol.
///
/// These are programming-contract errors of the calling stage, not runtime
/// conditions a pipeline is expected to recover from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueProtocolError {
    #[error("queue `{queue}` was already marked complete")]
    AlreadyComplete { queue: Arc<str> },

    #[error("enqueue on queue `{queue}` after it was marked complete")]
    EnqueueAfterComplete { queue: Arc<str> },
}

/// One unit of transfer between pipeline stages.
///
/// `seq` increases monotonically per queue and exists for diagnostics only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<T> {
    pub target: Arc<str>,
    pub seq: u64,
    pub payload: T,
}

impl<T> WorkItem<T> {
    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Counters describing the queue's lifetime so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub pending: usize,
    pub completed: bool,
}

struct QueueState<T> {
    items: VecDeque<WorkItem<T>>,
    completed: bool,
    next_seq: u64,
    dequeued: u64,
}

pub struct WorkQueue<T> {
    name: Arc<str>,
    target: Arc<str>,
    state: Mutex<QueueState<T>>,
    notify: Notify,
}

impl<T> fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<T> WorkQueue<T> {
    /// Create an empty queue. `name` identifies the queue in logs, `target`
    /// is stamped on every item enqueued.
    pub fn new(name: impl Into<Arc<str>>, target: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                completed: false,
                next_seq: 0,
                dequeued: 0,
            }),
            notify: Notify::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an item and wake one waiting consumer. Returns the item's
    /// sequence number.
    pub fn enqueue(&self, payload: T) -> Result<u64, QueueProtocolError> {
        let seq = {
            let mut state = self.state.lock();
            if state.completed {
                return Err(QueueProtocolError::EnqueueAfterComplete {
                    queue: self.name.clone(),
                });
            }
            let seq = state.next_seq;
            state.next_seq += 1;
            state.items.push_back(WorkItem {
                target: self.target.clone(),
                seq,
                payload,
            });
            seq
        };
        trace!(queue = %self.name, seq, "Enqueued work item");
        self.notify.notify_one();
        Ok(seq)
    }

    /// Take the next item without waiting.
    pub fn try_dequeue(&self) -> Option<WorkItem<T>> {
        let mut state = self.state.lock();
        let item = state.items.pop_front();
        if item.is_some() {
            state.dequeued += 1;
        }
        item
    }

    /// Wait for the next item.
    ///
    /// Returns `None` once the queue has been marked complete and drained.
    pub async fn dequeue(&self) -> Option<WorkItem<T>> {
        loop {
            // Register interest before inspecting the state so an enqueue or
            // completion racing with the check still wakes us.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock();
                if let Some(item) = state.items.pop_front() {
                    state.dequeued += 1;
                    return Some(item);
                }
                if state.completed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Signal that no further items will be enqueued.
    pub fn mark_complete(&self) -> Result<(), QueueProtocolError> {
        {
            let mut state = self.state.lock();
            if state.completed {
                return Err(QueueProtocolError::AlreadyComplete {
                    queue: self.name.clone(),
                });
            }
            state.completed = true;
        }
        trace!(queue = %self.name, "Queue marked complete");
        self.notify.notify_waiters();
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.state.lock().completed
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            enqueued: state.next_seq,
            dequeued: state.dequeued,
            pending: state.items.len(),
            completed: state.completed,
        }
    }
}
