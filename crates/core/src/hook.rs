//! Out-of-band error reporting for deferred invocations
//!
//! A debounced target runs long after the call that scheduled it returned,
//! so its errors have nowhere to propagate. They go to an `ErrorHook`
//! instead.

use crate::Error;
use crossbeam_channel::{Receiver, Sender};
use std::fmt;
use std::sync::Arc;
use tracing::error;

/// Receives errors that cannot be returned to a caller
#[derive(Clone)]
pub struct ErrorHook {
    report: Arc<dyn Fn(Error) + Send + Sync>,
}

impl ErrorHook {
    /// Hook backed by an arbitrary function
    pub fn new(report: impl Fn(Error) + Send + Sync + 'static) -> Self {
        Self {
            report: Arc::new(report),
        }
    }

    /// Hook that logs each error at `error` level
    pub fn log() -> Self {
        Self::new(log_error)
    }

    /// Hook that forwards errors to a channel.
    ///
    /// Once the receiver is dropped, errors are logged instead.
    pub fn channel() -> (Self, Receiver<Error>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self::sender(tx), rx)
    }

    /// Hook that forwards errors to an existing sender
    pub fn sender(tx: Sender<Error>) -> Self {
        Self::new(move |err| {
            if let Err(returned) = tx.send(err) {
                log_error(returned.into_inner());
            }
        })
    }

    /// Deliver an error
    pub fn report(&self, err: Error) {
        (self.report)(err)
    }
}

impl Default for ErrorHook {
    fn default() -> Self {
        Self::log()
    }
}

impl fmt::Debug for ErrorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorHook").finish_non_exhaustive()
    }
}

fn log_error(err: Error) {
    error!(error = %err, "deferred invocation failed");
}
