//! Error taxonomy shared by every queue variant.
//!
//! - [`Error::Validation`]: the request was malformed and never entered a
//!   batch. Only the offending caller sees it.
//! - [`Error::Dispatch`]: the dispatcher failed. Every waiter captured in that
//!   cycle receives the same [`DispatchError`], and no later cycle is
//!   affected.
//! - [`Error::MissingResult`]: the dispatcher succeeded but returned nothing
//!   for a key it was handed. This is a dispatcher bug, not a user error.
//! - [`Error::NoRuntime`]: `enqueue` was called outside a tokio runtime, so no
//!   batch timer could be armed.
//! - [`Error::Abandoned`]: the batch carrying this waiter was torn down before
//!   it resolved (runtime shutdown or a panicking dispatcher).

use std::{fmt, sync::Arc};

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All outcomes a waiter can fail with.
///
/// `Clone` so one dispatch failure can be handed to many waiters verbatim.
#[derive(Clone, Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The request was rejected before batching.
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    /// The dispatcher itself failed for the whole cycle.
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// The dispatcher omitted a key that was part of its input.
    #[error("Dispatcher returned no result for key {key:?}")]
    MissingResult { key: String },

    /// No tokio runtime was available to arm the batch timer.
    #[error("No tokio runtime available to schedule the batch")]
    NoRuntime,

    /// The batch was dropped before resolving this waiter.
    #[error("Batch was abandoned before completing")]
    Abandoned,
}

impl Error {
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

/// A dispatcher failure shared by every waiter of one batch cycle.
///
/// The underlying error is reference counted, so all waiters observe the same
/// instance: [`DispatchError::ptr_eq`] holds between any two copies taken from
/// one cycle.
#[derive(Clone)]
pub struct DispatchError {
    inner: Arc<dyn std::error::Error + Send + Sync + 'static>,
}

impl DispatchError {
    /// Wraps an arbitrary error raised by a dispatcher.
    pub fn new<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(err),
        }
    }

    /// Builds a dispatch error from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Message(message.into())),
        }
    }

    /// Returns the wrapped error.
    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.inner
    }

    /// Attempts to view the wrapped error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Returns `true` when both handles point at the same underlying failure.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.inner)
    }
}

#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("store offline")]
    struct Offline;

    #[test]
    fn dispatch_error_clones_share_the_source() {
        let err = DispatchError::new(Offline);
        let copy = err.clone();
        assert!(err.ptr_eq(&copy));
        assert!(copy.downcast_ref::<Offline>().is_some());
        assert_eq!(copy.to_string(), "store offline");
    }

    #[test]
    fn error_messages_are_readable() {
        let err = Error::from(DispatchError::msg("boom"));
        assert_eq!(err.to_string(), "Dispatch failed: boom");

        let err = Error::MissingResult {
            key: "page:0".into(),
        };
        assert_eq!(err.to_string(), "Dispatcher returned no result for key \"page:0\"");

        assert_eq!(
            Error::validation("empty key").to_string(),
            "Invalid request: empty key"
        );
    }
}
