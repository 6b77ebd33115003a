//! Cadence CLI library: scenario files and replay

pub mod demo;
pub mod replay;
pub mod scenario;

pub use replay::{replay_realtime, replay_virtual, Event, Outcome, Timeline};
pub use scenario::{Kind, Scenario, ScriptedCall};
