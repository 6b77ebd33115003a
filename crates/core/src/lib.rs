//! Cadence Core - call-rate control wrappers
//!
//! This crate provides:
//! - `Debounced`: collapse bursts into one deferred call (last call wins)
//! - `Throttled`: at most one call per window (leading edge only)
//! - Call records, validated waits, and the out-of-band error hook
//! - TOML rate configuration
//!
//! Wrappers schedule against any `cadence_timer::TimerFacility`.

pub mod config;
pub mod debounce;
pub mod error;
pub mod hook;
pub mod record;
pub mod throttle;
pub mod wait;

// Re-exports
pub use config::RateConfig;
pub use debounce::Debounced;
pub use error::Error;
pub use hook::ErrorHook;
pub use record::{Args, CallRecord};
pub use throttle::{Status, Throttled};
pub use wait::Wait;

pub use cadence_timer::{ManualTimer, TimerFacility, TimerRef, TokioTimer};

/// Result type for wrapper operations
pub type Result<T> = std::result::Result<T, Error>;
