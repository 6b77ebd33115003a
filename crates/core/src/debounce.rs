//! Debounced invoker
//!
//! Collapses a burst of calls into one deferred invocation of the target,
//! using the last call's arguments and context. Every call cancels the
//! previously scheduled timer and schedules a fresh one, so the target runs
//! `wait` after the last call of the burst.

use crate::hook::ErrorHook;
use crate::record::CallRecord;
use crate::wait::Wait;
use crate::{Error, Result};
use cadence_timer::{TimerHandle, TimerRef};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::debug;

type Target<A, C> = Box<dyn Fn(CallRecord<A, C>) -> anyhow::Result<()> + Send + Sync>;

/// Wrapper that defers the target until calls stop arriving for `wait`
pub struct Debounced<A, C> {
    shared: Arc<Shared<A, C>>,
}

struct Shared<A, C> {
    target: Target<A, C>,
    wait: Wait,
    timer: TimerRef,
    on_error: ErrorHook,
    state: Mutex<State<A, C>>,
}

struct State<A, C> {
    /// The single live timer, if an invocation is pending
    pending: Option<Pending>,
    /// Arguments and context of the most recent call
    last_call: Option<CallRecord<A, C>>,
    /// Bumped on every schedule; a firing callback with an older value is stale
    generation: u64,
    /// Invocations that have left the pending slot but not yet returned
    running: usize,
}

struct Pending {
    handle: TimerHandle,
    generation: u64,
}

impl<A, C> Debounced<A, C>
where
    A: Send + 'static,
    C: Send + 'static,
{
    /// Wrap `target`, logging deferred invocation errors.
    ///
    /// Fails with a configuration error if `wait` is negative or not a number.
    pub fn new<W, F>(timer: TimerRef, wait: W, target: F) -> Result<Self>
    where
        W: TryInto<Wait>,
        W::Error: Into<Error>,
        F: Fn(CallRecord<A, C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::with_hook(timer, wait, target, ErrorHook::default())
    }

    /// Wrap `target`, sending deferred invocation errors to `on_error`
    pub fn with_hook<W, F>(timer: TimerRef, wait: W, target: F, on_error: ErrorHook) -> Result<Self>
    where
        W: TryInto<Wait>,
        W::Error: Into<Error>,
        F: Fn(CallRecord<A, C>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let wait = wait.try_into().map_err(Into::into)?;

        Ok(Self {
            shared: Arc::new(Shared {
                target: Box::new(target),
                wait,
                timer,
                on_error,
                state: Mutex::new(State {
                    pending: None,
                    last_call: None,
                    generation: 0,
                    running: 0,
                }),
            }),
        })
    }

    /// Record a call and (re)start the countdown
    pub fn call(&self, args: impl IntoIterator<Item = A>, context: C) {
        self.call_with(CallRecord::new(args, context))
    }

    /// Record a pre-built call and (re)start the countdown
    pub fn call_with(&self, record: CallRecord<A, C>) {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        state.last_call = Some(record);

        if let Some(previous) = state.pending.take() {
            shared.timer.cancel(previous.handle);
        }

        state.generation += 1;
        let generation = state.generation;

        // Callback holds a weak reference so a pending timer never keeps a
        // dropped wrapper alive
        let weak = Arc::downgrade(&self.shared);
        let handle = shared.timer.schedule(
            shared.wait.as_duration(),
            Box::new(move || fire(&weak, generation)),
        );

        state.pending = Some(Pending { handle, generation });
        debug!(generation, wait = %shared.wait, "debounce scheduled");
    }

    /// Discard the pending invocation, if any.
    ///
    /// Returns whether an invocation was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.shared.state.lock();
        state.last_call = None;
        match state.pending.take() {
            Some(pending) => {
                self.shared.timer.cancel(pending.handle);
                debug!(generation = pending.generation, "debounce cancelled");
                true
            }
            None => false,
        }
    }

    /// Run the pending invocation now instead of waiting for the timer.
    ///
    /// The target's error is returned to the caller. Returns whether the
    /// target ran.
    pub fn flush(&self) -> Result<bool> {
        let record = {
            let mut state = self.shared.state.lock();
            let Some(pending) = state.pending.take() else {
                return Ok(false);
            };
            self.shared.timer.cancel(pending.handle);
            debug!(generation = pending.generation, "debounce flushed");
            let record = state.last_call.take();
            if record.is_some() {
                state.running += 1;
            }
            record
        };

        match record {
            Some(record) => {
                let _running = Running(&*self.shared);
                (self.shared.target)(record).map_err(Error::Invocation)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Whether an invocation is waiting on the timer.
    ///
    /// Turns false as soon as the timer fires, before the target returns.
    pub fn is_pending(&self) -> bool {
        self.shared.state.lock().pending.is_some()
    }

    /// Whether nothing is pending and no invocation is still running
    pub fn is_idle(&self) -> bool {
        let state = self.shared.state.lock();
        state.pending.is_none() && state.running == 0
    }

    /// Configured delay
    pub fn wait(&self) -> Wait {
        self.shared.wait
    }
}

/// Timer callback: run the target if this schedule is still the current one
fn fire<A, C>(weak: &Weak<Shared<A, C>>, generation: u64) {
    let Some(shared) = weak.upgrade() else { return };

    let record = {
        let mut state = shared.state.lock();
        match &state.pending {
            Some(pending) if pending.generation == generation => {}
            // Superseded by a later call, or cancelled/flushed
            _ => return,
        }
        state.pending = None;
        let record = state.last_call.take();
        if record.is_some() {
            state.running += 1;
        }
        record
    };

    let Some(record) = record else { return };
    debug!(generation, "debounce firing");

    let _running = Running(&*shared);
    if let Err(err) = (shared.target)(record) {
        shared.on_error.report(Error::Invocation(err));
    }
}

/// Marks one invocation finished when dropped, including on panic
struct Running<'a, A, C>(&'a Shared<A, C>);

impl<A, C> Drop for Running<'_, A, C> {
    fn drop(&mut self) {
        self.0.state.lock().running -= 1;
    }
}

impl<A, C> Drop for Debounced<A, C> {
    fn drop(&mut self) {
        let pending = self.shared.state.lock().pending.take();
        if let Some(pending) = pending {
            self.shared.timer.cancel(pending.handle);
        }
    }
}

impl<A, C> fmt::Debug for Debounced<A, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Debounced")
            .field("wait", &self.shared.wait)
            .field("pending", &state.pending.is_some())
            .field("generation", &state.generation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_timer::ManualTimer;
    use std::time::Duration;

    type Calls = Arc<Mutex<Vec<(Duration, Vec<&'static str>, &'static str)>>>;
    type SharedTarget =
        Arc<dyn Fn(CallRecord<&'static str, &'static str>) -> anyhow::Result<()> + Send + Sync>;

    /// Debounced wrapper on a manual clock that records (time, args, context)
    fn recording(
        timer: &Arc<ManualTimer>,
        wait: u64,
    ) -> (Debounced<&'static str, &'static str>, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let clock = timer.clone();
        let debounced = Debounced::<&'static str, &'static str>::new(timer.clone(), wait, move |record| {
            sink.lock().push((clock.now(), record.args.to_vec(), record.context));
            Ok(())
        })
        .unwrap();
        (debounced, calls)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_collapses_to_last_call() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, calls) = recording(&timer, 100);

        debounced.call(["t0"], "ctx");
        timer.advance_to(ms(50));
        debounced.call(["t50"], "ctx");
        timer.advance_to(ms(90));
        debounced.call(["t90"], "ctx");

        timer.advance_to(ms(189));
        assert!(calls.lock().is_empty());

        timer.advance_to(ms(300));
        assert_eq!(*calls.lock(), vec![(ms(190), vec!["t90"], "ctx")]);
        assert!(!debounced.is_pending());
    }

    #[test]
    fn test_wait_reports_configured_delay() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, _calls) = recording(&timer, 100);
        assert_eq!(debounced.wait(), Wait::from_millis(100));
        assert_eq!(debounced.wait().as_duration(), ms(100));
    }

    #[test]
    fn test_idle_only_after_target_returns() {
        let timer = Arc::new(ManualTimer::new());
        let slot: Arc<Mutex<Option<Arc<Debounced<u8, ()>>>>> = Arc::new(Mutex::new(None));
        let observed = Arc::new(Mutex::new(Vec::new()));

        let inner_slot = slot.clone();
        let sink = observed.clone();
        let debounced = Arc::new(
            Debounced::new(timer.clone(), 10u64, move |_: CallRecord<u8, ()>| {
                if let Some(me) = inner_slot.lock().as_ref() {
                    sink.lock().push((me.is_pending(), me.is_idle()));
                }
                Ok(())
            })
            .unwrap(),
        );
        *slot.lock() = Some(debounced.clone());

        assert!(debounced.is_idle());
        debounced.call([1], ());
        assert!(!debounced.is_idle());

        timer.run_until_idle();
        // Inside the target: no longer pending, but not idle either
        assert_eq!(*observed.lock(), vec![(false, false)]);
        assert!(debounced.is_idle());

        debounced.call([2], ());
        debounced.flush().unwrap();
        assert_eq!(observed.lock()[1], (false, false));
        assert!(debounced.is_idle());

        slot.lock().take();
    }

    #[test]
    fn test_idle_after_failing_target() {
        let timer = Arc::new(ManualTimer::new());
        let (hook, _errors) = ErrorHook::channel();
        let debounced =
            Debounced::<u8, ()>::with_hook(timer.clone(), 10u64, |_| anyhow::bail!("nope"), hook)
                .unwrap();

        debounced.call([1], ());
        timer.run_until_idle();
        assert!(debounced.is_idle());

        debounced.call([2], ());
        assert!(debounced.flush().is_err());
        assert!(debounced.is_idle());
    }

    #[test]
    fn test_separated_calls_fire_independently() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, calls) = recording(&timer, 100);

        debounced.call(["first"], "a");
        timer.advance_to(ms(200));
        debounced.call(["second"], "b");
        timer.advance_to(ms(400));

        assert_eq!(
            *calls.lock(),
            vec![(ms(100), vec!["first"], "a"), (ms(300), vec!["second"], "b")]
        );
    }

    #[test]
    fn test_only_one_live_timer() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, _calls) = recording(&timer, 100);

        for _ in 0..10 {
            debounced.call(["x"], "ctx");
        }
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn test_zero_wait_is_deferred() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, calls) = recording(&timer, 0);

        debounced.call(["now?"], "ctx");
        assert!(calls.lock().is_empty());
        assert!(debounced.is_pending());

        timer.advance(Duration::ZERO);
        assert_eq!(calls.lock().len(), 1);
    }

    #[test]
    fn test_context_forwarded_at_fire_time() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, calls) = recording(&timer, 80);

        debounced.call([], "obj.value=42");
        timer.run_until_idle();

        let calls = calls.lock();
        assert_eq!(calls[0].2, "obj.value=42");
        assert!(calls[0].1.is_empty());
    }

    #[test]
    fn test_instances_do_not_interfere() {
        let timer = Arc::new(ManualTimer::new());
        let (a, a_calls) = recording(&timer, 60);
        let (b, b_calls) = recording(&timer, 60);

        a.call(["a"], "ctx");
        b.call(["b"], "ctx");
        timer.advance_to(ms(30));
        a.call(["a again"], "ctx");

        timer.advance_to(ms(60));
        assert!(a_calls.lock().is_empty());
        assert_eq!(b_calls.lock().len(), 1);

        timer.advance_to(ms(90));
        assert_eq!(a_calls.lock().len(), 1);
        assert_eq!(b_calls.lock().len(), 1);
    }

    #[test]
    fn test_shared_target_keeps_instances_apart() {
        let timer = Arc::new(ManualTimer::new());
        let log: Calls = Arc::new(Mutex::new(Vec::new()));

        let sink = log.clone();
        let clock = timer.clone();
        let target: SharedTarget = Arc::new(move |record| {
            sink.lock().push((clock.now(), record.args.to_vec(), record.context));
            Ok(())
        });

        let wrap = |target: SharedTarget| {
            Debounced::<&'static str, &'static str>::new(timer.clone(), 50u64, move |record| {
                target(record)
            })
            .unwrap()
        };
        let a = wrap(target.clone());
        let b = wrap(target);

        a.call(["a1"], "A");
        timer.advance_to(ms(20));
        b.call(["b1"], "B");
        timer.advance_to(ms(40));
        a.call(["a2"], "A");

        timer.run_until_idle();
        assert_eq!(
            *log.lock(),
            vec![(ms(70), vec!["b1"], "B"), (ms(90), vec!["a2"], "A")]
        );
    }

    #[test]
    fn test_cancel_discards_pending() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, calls) = recording(&timer, 100);

        debounced.call(["dropped"], "ctx");
        assert!(debounced.cancel());
        assert!(!debounced.cancel());
        assert_eq!(timer.pending(), 0);

        timer.run_until_idle();
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_flush_runs_immediately() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, calls) = recording(&timer, 100);

        assert!(!debounced.flush().unwrap());

        debounced.call(["a"], "ctx");
        debounced.call(["b"], "ctx");
        assert!(debounced.flush().unwrap());
        assert_eq!(*calls.lock(), vec![(ms(0), vec!["b"], "ctx")]);

        // Timer was cancelled; nothing fires later
        timer.run_until_idle();
        assert_eq!(calls.lock().len(), 1);
    }

    #[test]
    fn test_flush_propagates_target_error() {
        let timer = Arc::new(ManualTimer::new());
        let debounced =
            Debounced::<u8, ()>::new(timer.clone(), 10u64, |_| anyhow::bail!("target exploded")).unwrap();

        debounced.call([1], ());
        let err = debounced.flush().unwrap_err();
        assert!(err.is_invocation());
        assert!(!debounced.is_pending());
    }

    #[test]
    fn test_deferred_error_reaches_hook() {
        let timer = Arc::new(ManualTimer::new());
        let (hook, errors) = ErrorHook::channel();
        let debounced = Debounced::<u8, ()>::with_hook(
            timer.clone(),
            10u64,
            |record| anyhow::bail!("bad input {}", record.args[0]),
            hook,
        )
        .unwrap();

        debounced.call([7], ());
        timer.run_until_idle();

        let err = errors.try_recv().unwrap();
        assert_eq!(err.to_string(), "target invocation failed: bad input 7");
    }

    #[test]
    fn test_negative_wait_fails_at_wrap_time() {
        let timer = Arc::new(ManualTimer::new());
        let result = Debounced::<u8, ()>::new(timer, -100i64, |_| Ok(()));
        assert!(result.unwrap_err().is_configuration());

        let timer = Arc::new(ManualTimer::new());
        let result = Debounced::<u8, ()>::new(timer, "later", |_| Ok(()));
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn test_drop_cancels_timer() {
        let timer = Arc::new(ManualTimer::new());
        let (debounced, calls) = recording(&timer, 100);

        debounced.call(["orphan"], "ctx");
        drop(debounced);

        assert_eq!(timer.pending(), 0);
        timer.run_until_idle();
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_target_may_call_back_in() {
        let timer = Arc::new(ManualTimer::new());
        let slot: Arc<Mutex<Option<Arc<Debounced<u32, ()>>>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(Mutex::new(Vec::new()));

        let inner_slot = slot.clone();
        let sink = count.clone();
        let debounced = Arc::new(
            Debounced::new(timer.clone(), 10u64, move |record: CallRecord<u32, ()>| {
                let n = record.args[0];
                sink.lock().push(n);
                if n < 3 {
                    if let Some(me) = inner_slot.lock().as_ref() {
                        me.call([n + 1], ());
                    }
                }
                Ok(())
            })
            .unwrap(),
        );
        *slot.lock() = Some(debounced.clone());

        debounced.call([1], ());
        timer.run_until_idle();
        assert_eq!(*count.lock(), vec![1, 2, 3]);

        // Break the reference cycle
        slot.lock().take();
    }
}
