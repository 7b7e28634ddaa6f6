//! Failure taxonomy for component execution and child reconciliation.

use thiserror::Error;

use crate::value::SharedValue;

/// A classified failure raised while rendering a component subtree.
///
/// Classification happens at the collaborator boundary: the component
/// executors already know whether a failure is a pending asynchronous result
/// or a genuine error, so the dispatcher never has to guess from the shape of
/// a thrown value. Neither variant is fatal by itself: the dispatcher marks
/// the instance and hands the recovery decision to
/// [`Backend::dispatch_failure`](crate::backend::Backend::dispatch_failure).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Failure {
    /// The subtree is waiting on an external completion. The payload is the
    /// pending handle the recovery mechanism resumes on.
    #[error("render suspended awaiting an external completion")]
    Suspended(SharedValue),
    /// The subtree failed outright. The payload is the cause, for the nearest
    /// error boundary to consume.
    #[error("component render failed")]
    Errored(SharedValue),
}

impl Failure {
    /// Whether this failure is a suspension rather than an error.
    #[must_use]
    pub const fn is_suspension(&self) -> bool {
        matches!(self, Self::Suspended(_))
    }

    /// The opaque payload carried by either variant.
    #[must_use]
    pub const fn payload(&self) -> &SharedValue {
        match self {
            Self::Suspended(payload) | Self::Errored(payload) => payload,
        }
    }
}
