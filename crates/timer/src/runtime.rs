//! Tokio-backed timer facility
//!
//! Each scheduled callback gets its own task that sleeps until the deadline
//! and then claims its slot in the live table. Cancel removes the slot and
//! aborts the task, so whichever side removes the slot first wins and a
//! callback runs at most once.

use crate::{Callback, Result, TimerError, TimerFacility, TimerHandle};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Timer facility that runs callbacks on a tokio runtime
pub struct TokioTimer {
    /// Runtime the sleeper tasks are spawned on
    runtime: Handle,
    /// Monotonic handle id counter
    next_id: AtomicU64,
    /// Live callbacks: id -> abort handle (None until the task is spawned)
    live: Arc<DashMap<u64, Option<AbortHandle>>>,
}

impl TokioTimer {
    /// Create a timer on the current tokio runtime
    ///
    /// Fails with `TimerError::NoRuntime` when called outside a runtime.
    pub fn new() -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        Ok(Self::with_handle(runtime))
    }

    /// Create a timer that spawns onto the given runtime
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            live: Arc::new(DashMap::new()),
        }
    }

    /// Number of callbacks scheduled and not yet fired or cancelled
    pub fn pending(&self) -> usize {
        self.live.len()
    }
}

impl TimerFacility for TokioTimer {
    fn schedule(&self, delay: Duration, callback: Callback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let deadline = Instant::now() + delay;

        // Slot goes in before the task exists so a zero-delay task can't
        // find it missing
        self.live.insert(id, None);

        let live = Arc::clone(&self.live);
        let task = self.runtime.spawn(async move {
            sleep_until(deadline).await;
            if live.remove(&id).is_some() {
                trace!(id, "tokio timer firing");
                callback();
            }
        });

        if let Some(mut slot) = self.live.get_mut(&id) {
            *slot = Some(task.abort_handle());
        }
        trace!(id, ?delay, "tokio timer scheduled");

        TimerHandle::from_raw(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some((id, slot)) = self.live.remove(&handle.id()) {
            if let Some(task) = slot {
                task.abort();
            }
            trace!(id, "tokio timer cancelled");
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for entry in self.live.iter() {
            if let Some(task) = entry.value() {
                task.abort();
            }
        }
        self.live.clear();
    }
}
