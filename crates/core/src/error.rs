//! Error taxonomy for the rate-control wrappers

use std::convert::Infallible;

/// Errors raised by wrappers and their configuration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A delay or window value was rejected when wrapping
    #[error("invalid {what}: {reason}")]
    Configuration {
        /// Which value was rejected ("wait", "debounce.delay_ms", ...)
        what: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// The target function failed while being invoked
    #[error("target invocation failed: {0:#}")]
    Invocation(anyhow::Error),

    /// The timer facility could not be set up
    #[error(transparent)]
    Timer(#[from] cadence_timer::TimerError),
}

impl Error {
    pub(crate) fn configuration(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            what,
            reason: reason.into(),
        }
    }

    /// Whether this error was raised at wrap/configuration time
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Whether this error came from the wrapped target
    pub fn is_invocation(&self) -> bool {
        matches!(self, Self::Invocation(_))
    }

    /// The target's own error, if this is an invocation failure
    pub fn into_invocation(self) -> Option<anyhow::Error> {
        match self {
            Self::Invocation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
