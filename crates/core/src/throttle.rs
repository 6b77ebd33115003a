//! Throttled invoker
//!
//! Leading-edge only: the first call in a window runs the target inline and
//! starts a cooldown; calls made while cooling are dropped outright. There is
//! no queuing and no trailing call when the window ends.

use crate::record::CallRecord;
use crate::wait::Wait;
use crate::{Error, Result};
use cadence_timer::{TimerHandle, TimerRef};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

type Target<A, C, R> = Box<dyn Fn(CallRecord<A, C>) -> anyhow::Result<R> + Send + Sync>;

/// Throttle state machine; cycles Open -> Cooling -> Open indefinitely
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Next call runs the target
    Open,
    /// Calls are dropped until the window elapses
    Cooling,
}

/// Wrapper that runs the target at most once per `window`
pub struct Throttled<A, C, R = ()> {
    shared: Arc<Shared<A, C, R>>,
}

struct Shared<A, C, R> {
    target: Target<A, C, R>,
    window: Wait,
    timer: TimerRef,
    state: Mutex<State>,
}

struct State {
    status: Status,
    /// Timer that reopens the wrapper, present only while cooling
    cooldown: Option<Cooldown>,
    generation: u64,
}

struct Cooldown {
    handle: TimerHandle,
    generation: u64,
}

impl<A, C, R> Throttled<A, C, R>
where
    A: 'static,
    C: 'static,
    R: 'static,
{
    /// Wrap `target` with a cooldown of `window`.
    ///
    /// Fails with a configuration error if `window` is negative or not a
    /// number.
    pub fn new<W, F>(timer: TimerRef, window: W, target: F) -> Result<Self>
    where
        W: TryInto<Wait>,
        W::Error: Into<Error>,
        F: Fn(CallRecord<A, C>) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        let window = window.try_into().map_err(Into::into)?;

        Ok(Self {
            shared: Arc::new(Shared {
                target: Box::new(target),
                window,
                timer,
                state: Mutex::new(State {
                    status: Status::Open,
                    cooldown: None,
                    generation: 0,
                }),
            }),
        })
    }

    /// Call through the throttle.
    ///
    /// Returns `Ok(Some(_))` with the target's result when it ran, `Ok(None)`
    /// when the call was dropped, and the target's error otherwise.
    pub fn call(&self, args: impl IntoIterator<Item = A>, context: C) -> Result<Option<R>> {
        self.call_with(CallRecord::new(args, context))
    }

    /// Call through the throttle with a pre-built record
    pub fn call_with(&self, record: CallRecord<A, C>) -> Result<Option<R>> {
        if !self.admit() {
            trace!("throttle cooling, call dropped");
            return Ok(None);
        }

        let output = (self.shared.target)(record).map_err(Error::Invocation)?;
        Ok(Some(output))
    }

    /// Decide whether a call runs, starting the cooldown if it does.
    ///
    /// The cooldown is in place before the target runs, so re-entrant calls
    /// are dropped and a failing target still reopens on schedule.
    fn admit(&self) -> bool {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        if state.status == Status::Cooling {
            return false;
        }

        // A zero window never cools
        if shared.window.is_zero() {
            return true;
        }

        state.status = Status::Cooling;
        state.generation += 1;
        let generation = state.generation;

        let weak = Arc::downgrade(&self.shared);
        let handle = shared.timer.schedule(
            shared.window.as_duration(),
            Box::new(move || reopen(&weak, generation)),
        );
        state.cooldown = Some(Cooldown { handle, generation });
        debug!(generation, window = %shared.window, "throttle cooling");

        true
    }

    /// End the cooldown early.
    ///
    /// Returns whether the wrapper was cooling.
    pub fn reset(&self) -> bool {
        let mut state = self.shared.state.lock();
        if let Some(cooldown) = state.cooldown.take() {
            self.shared.timer.cancel(cooldown.handle);
        }
        let was_cooling = state.status == Status::Cooling;
        state.status = Status::Open;
        was_cooling
    }

    /// Current state
    pub fn status(&self) -> Status {
        self.shared.state.lock().status
    }

    /// Whether calls are currently being dropped
    pub fn is_cooling(&self) -> bool {
        self.status() == Status::Cooling
    }

    /// Configured cooldown window
    pub fn window(&self) -> Wait {
        self.shared.window
    }
}

/// Timer callback: reopen if this cooldown is still the current one
fn reopen<A, C, R>(weak: &Weak<Shared<A, C, R>>, generation: u64) {
    let Some(shared) = weak.upgrade() else { return };
    let mut state = shared.state.lock();

    if state.cooldown.as_ref().map(|c| c.generation) == Some(generation) {
        state.cooldown = None;
        state.status = Status::Open;
        debug!(generation, "throttle open");
    }
}

impl<A, C, R> Drop for Throttled<A, C, R> {
    fn drop(&mut self) {
        let cooldown = self.shared.state.lock().cooldown.take();
        if let Some(cooldown) = cooldown {
            self.shared.timer.cancel(cooldown.handle);
        }
    }
}

impl<A, C, R> fmt::Debug for Throttled<A, C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Throttled")
            .field("window", &self.shared.window)
            .field("status", &state.status)
            .finish()
    }
}
