//! Scenario replay against real wrappers
//!
//! Virtual replays run on a `ManualTimer`, so their timelines are exact and
//! repeatable. Realtime replays run on the tokio facility with real sleeps.

use crate::scenario::{Kind, Scenario, ScriptedCall};
use anyhow::{Context, Result};
use cadence_core::{
    CallRecord, Debounced, ManualTimer, RateConfig, Throttled, TimerRef, TokioTimer, Wait,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// What happened at one point of a replay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Debounce call recorded; the target runs later
    Deferred,
    /// Target ran
    Invoked,
    /// Throttle call dropped while cooling
    Dropped,
}

/// One line of a replay timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// Milliseconds since the replay started
    pub at_ms: u64,
    pub instance: String,
    pub outcome: Outcome,
    pub args: Vec<String>,
    pub context: String,
}

/// Result of replaying a scenario
#[derive(Debug, Clone, Serialize)]
pub struct Timeline {
    pub name: String,
    pub kind: Kind,
    pub wait_ms: u64,
    pub expected: Option<usize>,
    pub events: Vec<Event>,
}

impl Timeline {
    /// Number of target invocations
    pub fn invocations(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.outcome == Outcome::Invoked)
            .count()
    }

    /// Invocations of one instance
    pub fn invocations_of(&self, instance: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.outcome == Outcome::Invoked && e.instance == instance)
            .count()
    }

    /// Whether the scenario's expected invocation count (if any) was met
    pub fn meets_expectation(&self) -> bool {
        self.expected.map_or(true, |expected| expected == self.invocations())
    }
}

type Clock = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Collects events from calls and target invocations
#[derive(Clone)]
struct Recorder {
    clock: Clock,
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    fn new(clock: Clock) -> Self {
        Self {
            clock,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn record(&self, instance: &str, outcome: Outcome, args: Vec<String>, context: String) {
        let at_ms = (self.clock)().as_millis() as u64;
        debug!(at_ms, instance, ?outcome, "replay event");
        self.events.lock().push(Event {
            at_ms,
            instance: instance.to_string(),
            outcome,
            args,
            context,
        });
    }

    /// Target that records an invocation for `instance`
    fn target(
        &self,
        instance: &str,
    ) -> impl Fn(CallRecord<String, String>) -> anyhow::Result<()> + Send + Sync + 'static {
        let recorder = self.clone();
        let instance = instance.to_string();
        move |record| {
            let (args, context) = record.into_parts();
            recorder.record(&instance, Outcome::Invoked, args.into_vec(), context);
            Ok(())
        }
    }

    fn finish(&self, scenario: &Scenario, wait: Wait) -> Timeline {
        Timeline {
            name: scenario.title(),
            kind: scenario.kind,
            wait_ms: wait.as_millis() as u64,
            expected: scenario.expect_invocations,
            events: std::mem::take(&mut *self.events.lock()),
        }
    }
}

enum Wrapper {
    Debounce(Debounced<String, String>),
    Throttle(Throttled<String, String>),
}

/// One wrapper per instance name, all sharing the same timer
struct Instances {
    wrappers: BTreeMap<String, Wrapper>,
    recorder: Recorder,
}

impl Instances {
    fn build(scenario: &Scenario, wait: Wait, timer: TimerRef, recorder: &Recorder) -> Result<Self> {
        let mut wrappers = BTreeMap::new();
        for name in scenario.instances() {
            let target = recorder.target(name);
            let wrapper = match scenario.kind {
                Kind::Debounce => Wrapper::Debounce(Debounced::new(timer.clone(), wait, target)?),
                Kind::Throttle => Wrapper::Throttle(Throttled::new(timer.clone(), wait, target)?),
            };
            wrappers.insert(name.to_string(), wrapper);
        }

        Ok(Self {
            wrappers,
            recorder: recorder.clone(),
        })
    }

    fn call(&self, call: &ScriptedCall) -> Result<()> {
        let wrapper = self
            .wrappers
            .get(&call.instance)
            .with_context(|| format!("No wrapper for instance {}", call.instance))?;

        match wrapper {
            Wrapper::Debounce(debounced) => {
                self.recorder.record(
                    &call.instance,
                    Outcome::Deferred,
                    call.args.clone(),
                    call.context.clone(),
                );
                debounced.call(call.args.iter().cloned(), call.context.clone());
            }
            Wrapper::Throttle(throttled) => {
                let ran = throttled
                    .call(call.args.iter().cloned(), call.context.clone())?
                    .is_some();
                if !ran {
                    self.recorder.record(
                        &call.instance,
                        Outcome::Dropped,
                        call.args.clone(),
                        call.context.clone(),
                    );
                }
            }
        }
        Ok(())
    }

    /// Whether every deferred invocation has run to completion
    fn settled(&self) -> bool {
        self.wrappers.values().all(|wrapper| match wrapper {
            Wrapper::Debounce(debounced) => debounced.is_idle(),
            Wrapper::Throttle(_) => true,
        })
    }
}

/// Replay on a virtual clock
pub fn replay_virtual(scenario: &Scenario, config: &RateConfig) -> Result<Timeline> {
    let wait = scenario.wait(config)?;
    let timer = Arc::new(ManualTimer::new());

    let clock_timer = timer.clone();
    let recorder = Recorder::new(Arc::new(move || clock_timer.now()));
    let instances = Instances::build(scenario, wait, timer.clone(), &recorder)?;

    info!(scenario = %scenario.title(), %wait, "replaying on virtual clock");
    for call in scenario.ordered_calls() {
        timer.advance_to(Duration::from_millis(call.at_ms));
        instances.call(call)?;
    }
    timer.run_until_idle();

    Ok(recorder.finish(scenario, wait))
}

/// Replay in real time on the tokio timer facility
pub async fn replay_realtime(scenario: &Scenario, config: &RateConfig) -> Result<Timeline> {
    let wait = scenario.wait(config)?;
    let timer: TimerRef = Arc::new(TokioTimer::new()?);

    let start = tokio::time::Instant::now();
    let recorder = Recorder::new(Arc::new(move || start.elapsed()));
    let instances = Instances::build(scenario, wait, timer, &recorder)?;

    info!(scenario = %scenario.title(), %wait, "replaying in real time");
    for call in scenario.ordered_calls() {
        tokio::time::sleep_until(start + Duration::from_millis(call.at_ms)).await;
        instances.call(call)?;
    }

    // Wait for debounced targets to return, not just for their timers to fire
    let poll = wait.as_duration().min(Duration::from_millis(10)).max(Duration::from_millis(1));
    while !instances.settled() {
        tokio::time::sleep(poll).await;
    }

    Ok(recorder.finish(scenario, wait))
}
