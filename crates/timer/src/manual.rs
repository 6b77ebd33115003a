//! Virtual-clock timer facility
//!
//! Time only moves when the owner calls `advance`, `advance_to` or
//! `run_until_idle`. Due callbacks run one at a time, in deadline order
//! (scheduling order for ties), on the thread that advanced the clock.

use crate::{Callback, TimerFacility, TimerHandle};
use ahash::AHashMap;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;
use tracing::trace;

/// Deterministic timer facility driven by an explicit virtual clock
pub struct ManualTimer {
    queue: Mutex<Queue>,
}

struct Queue {
    /// Current virtual time, measured from construction
    now: Duration,
    /// Next handle id to hand out
    next_id: u64,
    /// Deadlines keyed by (deadline, id); cancelled ids are skipped lazily
    deadlines: BinaryHeap<Reverse<(Duration, u64)>>,
    /// Live callbacks by handle id
    callbacks: AHashMap<u64, Callback>,
}

impl Queue {
    /// Drop heap entries whose callback was cancelled
    fn prune(&mut self) {
        while let Some(Reverse((_, id))) = self.deadlines.peek() {
            if self.callbacks.contains_key(id) {
                break;
            }
            self.deadlines.pop();
        }
    }

    /// Pop the earliest live callback due at or before `limit`
    fn pop_due(&mut self, limit: Option<Duration>) -> Option<(Duration, u64, Callback)> {
        self.prune();
        let Reverse((at, id)) = *self.deadlines.peek()?;
        if limit.is_some_and(|limit| at > limit) {
            return None;
        }
        self.deadlines.pop();
        let callback = self.callbacks.remove(&id)?;
        Some((at, id, callback))
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTimer {
    /// Create a timer whose virtual clock starts at zero
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(Queue {
                now: Duration::ZERO,
                next_id: 1,
                deadlines: BinaryHeap::new(),
                callbacks: AHashMap::new(),
            }),
        }
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.queue.lock().now
    }

    /// Number of callbacks scheduled and not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.queue.lock().callbacks.len()
    }

    /// Deadline of the earliest pending callback
    pub fn next_deadline(&self) -> Option<Duration> {
        let mut queue = self.queue.lock();
        queue.prune();
        queue.deadlines.peek().map(|Reverse((at, _))| *at)
    }

    /// Move the clock forward by `by`, running every callback that falls due.
    ///
    /// Returns the number of callbacks that ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now() + by;
        self.advance_to(target)
    }

    /// Move the clock to `target`, running every callback due at or before it.
    ///
    /// Callbacks scheduled by running callbacks are honoured if they fall due
    /// before `target`. The clock never moves backwards.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let mut queue = self.queue.lock();
                match queue.pop_due(Some(target)) {
                    Some((at, id, callback)) => {
                        queue.now = queue.now.max(at);
                        Some((id, callback))
                    }
                    None => {
                        queue.now = queue.now.max(target);
                        None
                    }
                }
            };

            // Lock released: callbacks may schedule or cancel
            let Some((id, callback)) = next else { break };
            trace!(id, "manual timer firing");
            callback();
            fired += 1;
        }
        fired
    }

    /// Run pending callbacks in deadline order until none remain.
    ///
    /// The clock jumps to each deadline as it goes. Callbacks that keep
    /// rescheduling themselves will keep this running.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        loop {
            let next = {
                let mut queue = self.queue.lock();
                queue.pop_due(None).map(|(at, id, callback)| {
                    queue.now = queue.now.max(at);
                    (id, callback)
                })
            };

            let Some((id, callback)) = next else { break };
            trace!(id, "manual timer firing");
            callback();
            fired += 1;
        }
        fired
    }
}

impl TimerFacility for ManualTimer {
    fn schedule(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let mut queue = self.queue.lock();
        let id = queue.next_id;
        queue.next_id += 1;

        let at = queue.now + delay;
        queue.deadlines.push(Reverse((at, id)));
        queue.callbacks.insert(id, callback);
        trace!(id, ?delay, "manual timer scheduled");

        TimerHandle::from_raw(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut guard = self.queue.lock();
        let queue = &mut *guard;
        if queue.callbacks.remove(&handle.id()).is_none() {
            return;
        }
        trace!(id = handle.id(), "manual timer cancelled");

        // Keep cancelled deadlines from piling up under reschedule churn
        if queue.deadlines.len() > 2 * queue.callbacks.len() + 64 {
            let callbacks = &queue.callbacks;
            queue
                .deadlines
                .retain(|Reverse((_, id))| callbacks.contains_key(id));
        }
    }
}
