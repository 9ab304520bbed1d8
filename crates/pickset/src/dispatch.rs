//! Dispatcher contracts consumed by the queue variants.
//!
//! A dispatcher turns one frozen batch into one batch of outcomes. It may
//! fail, in which case the failure applies to every waiter of that cycle.
//!
//! Each trait has a blanket implementation for plain async closures, so a
//! dispatcher can be a struct holding shared state or just
//! `|batch| async move { ... }`.

use crate::error::DispatchError;
use core::future::Future;
use std::collections::HashMap;

/// A request that carries its own coalescing key.
///
/// Requests with equal keys that arrive within one window collapse to the most
/// recent one. An empty key is rejected before batching.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for String {
    fn key(&self) -> &str {
        self
    }
}

impl<V> Keyed for (String, V) {
    fn key(&self) -> &str {
        &self.0
    }
}

/// Dispatcher for a [`KeyedLatestQueue`](crate::KeyedLatestQueue).
///
/// Receives the most recent request for each distinct key and must return a
/// result for every one of those keys. A key missing from the returned map
/// fails that key's waiters with [`Error::MissingResult`].
///
/// [`Error::MissingResult`]: crate::Error::MissingResult
pub trait KeyedDispatch<R>: Send + Sync + 'static {
    type Output: Clone + Send + 'static;

    fn dispatch(
        &self,
        requests: Vec<R>,
    ) -> impl Future<Output = Result<HashMap<String, Self::Output>, DispatchError>> + Send;
}

impl<F, Fut, R, T> KeyedDispatch<R> for F
where
    F: Fn(Vec<R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HashMap<String, T>, DispatchError>> + Send,
    T: Clone + Send + 'static,
{
    type Output = T;

    fn dispatch(
        &self,
        requests: Vec<R>,
    ) -> impl Future<Output = Result<HashMap<String, T>, DispatchError>> + Send {
        self(requests)
    }
}

/// Outcome of one accumulated batch, or one caller's slice of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetOutcome<T, R> {
    /// Items taken into the shared set, in the order the dispatcher reported.
    pub accepted: Vec<T>,
    /// Items refused, each with the reason.
    pub rejected: Vec<Rejected<T, R>>,
}

impl<T, R> SetOutcome<T, R> {
    pub fn new(accepted: Vec<T>, rejected: Vec<Rejected<T, R>>) -> Self {
        Self { accepted, rejected }
    }
}

impl<T, R> Default for SetOutcome<T, R> {
    fn default() -> Self {
        Self {
            accepted: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

/// An item refused by a set dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejected<T, R> {
    pub item: T,
    pub reason: R,
}

impl<T, R> Rejected<T, R> {
    pub fn new(item: T, reason: R) -> Self {
        Self { item, reason }
    }
}

/// Dispatcher for an [`AccumulatingSetQueue`](crate::AccumulatingSetQueue).
///
/// Receives the deduplicated union of every caller's items, in first-arrival
/// order, and classifies each candidate once.
pub trait SetDispatch<T>: Send + Sync + 'static {
    type Reason: Clone + Send + 'static;

    fn dispatch(
        &self,
        candidates: Vec<T>,
    ) -> impl Future<Output = Result<SetOutcome<T, Self::Reason>, DispatchError>> + Send;
}

impl<F, Fut, T, R> SetDispatch<T> for F
where
    F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SetOutcome<T, R>, DispatchError>> + Send,
    R: Clone + Send + 'static,
{
    type Reason = R;

    fn dispatch(
        &self,
        candidates: Vec<T>,
    ) -> impl Future<Output = Result<SetOutcome<T, R>, DispatchError>> + Send {
        self(candidates)
    }
}

/// Dispatcher for a [`SinglePayloadQueue`](crate::SinglePayloadQueue).
pub trait PayloadDispatch<P>: Send + Sync + 'static {
    type Output: Clone + Send + 'static;

    /// Checks a payload before it is admitted. An `Err` fails only the caller
    /// that submitted it and leaves the pending payload untouched.
    fn validate(&self, _payload: &P) -> Result<(), String> {
        Ok(())
    }

    fn dispatch(
        &self,
        payload: P,
    ) -> impl Future<Output = Result<Self::Output, DispatchError>> + Send;
}

impl<F, Fut, P, T> PayloadDispatch<P> for F
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, DispatchError>> + Send,
    T: Clone + Send + 'static,
{
    type Output = T;

    fn dispatch(&self, payload: P) -> impl Future<Output = Result<T, DispatchError>> + Send {
        self(payload)
    }
}
