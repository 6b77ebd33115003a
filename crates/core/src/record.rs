//! Call records: the arguments and context captured at each call

use smallvec::SmallVec;

/// Ordered argument sequence; short argument lists stay inline
pub type Args<A> = SmallVec<[A; 4]>;

/// Arguments plus call context, captured atomically when a wrapper is called.
///
/// The context plays the role of the receiver the target should observe.
/// Wrappers forward the record to the target unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord<A, C> {
    /// Arguments in call order
    pub args: Args<A>,
    /// Binding the target observes during invocation
    pub context: C,
}

impl<A, C> CallRecord<A, C> {
    /// Capture a call
    pub fn new(args: impl IntoIterator<Item = A>, context: C) -> Self {
        Self {
            args: args.into_iter().collect(),
            context,
        }
    }

    /// Number of arguments
    pub fn arity(&self) -> usize {
        self.args.len()
    }

    /// Split into arguments and context
    pub fn into_parts(self) -> (Args<A>, C) {
        (self.args, self.context)
    }
}

impl<A> CallRecord<A, ()> {
    /// Capture a call that carries no context
    pub fn unbound(args: impl IntoIterator<Item = A>) -> Self {
        Self::new(args, ())
    }
}
