//! Validated delay / window values
//!
//! Both wrappers take a `Wait` at wrap time. Anything that converts into one
//! is checked there, so a negative or non-numeric value fails when wrapping
//! rather than on the first call.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Non-negative, finite time value used as a debounce delay or throttle window
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Wait(Duration);

impl Wait {
    /// Zero wait: debounce defers to the next timer turn, throttle never cools
    pub const ZERO: Wait = Wait(Duration::ZERO);

    /// Wrap a duration
    pub const fn new(duration: Duration) -> Self {
        Self(duration)
    }

    /// Whole milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// Fractional milliseconds; rejects negative, NaN and infinite values
    pub fn from_millis_f64(ms: f64) -> Result<Self> {
        Self::checked("wait", ms)
    }

    pub(crate) fn checked(what: &'static str, ms: f64) -> Result<Self> {
        if !ms.is_finite() {
            return Err(Error::configuration(what, format!("must be a finite number (got {ms})")));
        }
        if ms < 0.0 {
            return Err(Error::configuration(what, format!("must not be negative (got {ms})")));
        }
        let nanos = (ms * 1_000_000.0).round();
        if nanos >= u64::MAX as f64 {
            return Err(Error::configuration(what, format!("{ms}ms is out of range")));
        }
        Ok(Self(Duration::from_nanos(nanos as u64)))
    }

    /// The wait as a `Duration`
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Whether the wait is zero
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Whole milliseconds, truncated
    pub fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }
}

impl From<Duration> for Wait {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

impl From<u64> for Wait {
    fn from(ms: u64) -> Self {
        Self::from_millis(ms)
    }
}

impl From<Wait> for Duration {
    fn from(wait: Wait) -> Self {
        wait.0
    }
}

impl TryFrom<i64> for Wait {
    type Error = Error;

    fn try_from(ms: i64) -> Result<Self> {
        u64::try_from(ms)
            .map(Self::from_millis)
            .map_err(|_| Error::configuration("wait", format!("must not be negative (got {ms})")))
    }
}

impl TryFrom<f64> for Wait {
    type Error = Error;

    fn try_from(ms: f64) -> Result<Self> {
        Self::from_millis_f64(ms)
    }
}

impl TryFrom<&str> for Wait {
    type Error = Error;

    fn try_from(text: &str) -> Result<Self> {
        text.parse()
    }
}

impl FromStr for Wait {
    type Err = Error;

    /// Accepts `"100"` and `"100ms"` (milliseconds) or `"1.5s"` (seconds)
    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        let (number, scale) = if let Some(ms) = text.strip_suffix("ms") {
            (ms, 1.0)
        } else if let Some(secs) = text.strip_suffix('s') {
            (secs, 1000.0)
        } else {
            (text, 1.0)
        };

        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| Error::configuration("wait", format!("`{text}` is not a number")))?;
        Self::from_millis_f64(value * scale)
    }
}

impl fmt::Display for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}
