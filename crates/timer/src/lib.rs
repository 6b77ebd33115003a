//! Deferred-callback facility for Cadence
//!
//! This crate provides the timer seam the rate-control wrappers schedule
//! against:
//! - `TimerFacility` trait (schedule / cancel)
//! - Opaque, exclusively-owned `TimerHandle`s
//! - `TokioTimer`: one spawned task per pending callback
//! - `ManualTimer`: virtual clock with a single run queue, advanced by hand

pub mod manual;
pub mod runtime;

pub use manual::ManualTimer;
pub use runtime::TokioTimer;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A callback scheduled to run once after a delay
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Shared reference to a timer facility
pub type TimerRef = Arc<dyn TimerFacility>;

/// Errors raised while setting up a timer facility
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// `TokioTimer::new` was called outside a tokio runtime
    #[error("no tokio runtime is available to drive timers")]
    NoRuntime,
}

/// Result type for timer operations
pub type Result<T> = std::result::Result<T, TimerError>;

/// Schedules callbacks to run after a delay and cancels them before they fire.
///
/// Implementations must never run a callback synchronously from inside
/// `schedule`, even for a zero delay, and must treat cancelling an
/// already-fired or already-cancelled handle as a no-op.
pub trait TimerFacility: Send + Sync + 'static {
    /// Schedule `callback` to run once `delay` has elapsed
    fn schedule(&self, delay: Duration, callback: Callback) -> TimerHandle;

    /// Cancel a scheduled callback
    fn cancel(&self, handle: TimerHandle);
}

/// Opaque token identifying one pending delayed callback.
///
/// Handles are deliberately not `Clone`: whoever scheduled the callback owns
/// the only handle, and cancelling consumes it.
#[derive(PartialEq, Eq, Hash)]
pub struct TimerHandle {
    id: u64,
}

impl TimerHandle {
    /// Build a handle from a facility-assigned id
    pub const fn from_raw(id: u64) -> Self {
        Self { id }
    }

    /// Facility-assigned id of this handle
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerHandle(#{})", self.id)
    }
}
