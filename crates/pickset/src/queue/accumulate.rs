use crate::{
    dispatch::{SetDispatch, SetOutcome},
    error::Error,
    waiter::{Completion, Waiter},
    window::{Batch, Window, current_runtime},
};
use core::{hash::Hash, time::Duration};
use std::{collections::HashSet, sync::Arc};

/// Merges every caller's items into one deduplicated batch.
///
/// Each `enqueue` call is an independent pending request; calls are never
/// merged with each other. When the window elapses, the union of all requested
/// items (first-arrival order, duplicates removed) goes to the dispatcher once.
/// Each caller then receives the slice of the batch outcome covering exactly
/// the items it asked for. An item asked for by two callers shows up in both
/// slices, while the shared mutation behind it happened once.
pub struct AccumulatingSetQueue<T, D>
where
    D: SetDispatch<T>,
{
    shared: Arc<Shared<T, D>>,
}

impl<T, D> Clone for AccumulatingSetQueue<T, D>
where
    D: SetDispatch<T>,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T, D>
where
    D: SetDispatch<T>,
{
    window: Window<SetBatch<T, D::Reason>>,
    dispatcher: D,
}

struct SetRequest<T, R> {
    items: Vec<T>,
    wanted: HashSet<T>,
    waiter: Waiter<SetOutcome<T, R>>,
}

impl<T: Eq + Hash + Clone, R: Clone> SetRequest<T, R> {
    /// This caller's share of the batch outcome, in batch order.
    fn slice_of(&self, outcome: &SetOutcome<T, R>) -> SetOutcome<T, R> {
        SetOutcome {
            accepted: outcome
                .accepted
                .iter()
                .filter(|item| self.wanted.contains(*item))
                .cloned()
                .collect(),
            rejected: outcome
                .rejected
                .iter()
                .filter(|rejected| self.wanted.contains(&rejected.item))
                .cloned()
                .collect(),
        }
    }
}

struct SetBatch<T, R> {
    requests: Vec<SetRequest<T, R>>,
}

impl<T, R> Default for SetBatch<T, R> {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
        }
    }
}

impl<T: Send + 'static, R: Send + 'static> Batch for SetBatch<T, R> {
    fn len(&self) -> usize {
        self.requests.len()
    }
}

impl<T, R> SetBatch<T, R>
where
    T: Eq + Hash + Clone,
{
    /// Union of every request's items, deduplicated in first-arrival order.
    fn candidates(&self) -> Vec<T> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for item in self.requests.iter().flat_map(|r| r.items.iter()) {
            if seen.insert(item) {
                candidates.push(item.clone());
            }
        }
        candidates
    }
}

impl<T, D> AccumulatingSetQueue<T, D>
where
    T: Eq + Hash + Clone + Send + 'static,
    D: SetDispatch<T>,
{
    /// Creates a queue that flushes `window` after the first pending request.
    pub fn new(window: Duration, dispatcher: D) -> Self {
        Self {
            shared: Arc::new(Shared {
                window: Window::new(window),
                dispatcher,
            }),
        }
    }

    /// Submits a set of items into the current batch.
    ///
    /// Resolves with this caller's personal `{accepted, rejected}` slice of
    /// the batch outcome. An empty item list fails immediately with
    /// [`Error::Validation`].
    pub fn enqueue(&self, items: Vec<T>) -> Completion<SetOutcome<T, D::Reason>> {
        if items.is_empty() {
            return Completion::failed(Error::validation("at least one item is required"));
        }
        let Some(runtime) = current_runtime() else {
            return Completion::failed(Error::NoRuntime);
        };

        let wanted = items.iter().cloned().collect();
        let (waiter, completion) = Waiter::channel();
        let shared = Arc::clone(&self.shared);
        self.shared.window.admit(
            &runtime,
            |batch| {
                batch.requests.push(SetRequest {
                    items,
                    wanted,
                    waiter,
                })
            },
            move || shared.flush(),
        );
        completion
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.shared.window.is_armed()
    }
}

impl<T, D> Shared<T, D>
where
    T: Eq + Hash + Clone + Send + 'static,
    D: SetDispatch<T>,
{
    async fn flush(self: Arc<Self>) {
        let batch = self.window.drain();
        if batch.is_empty() {
            return;
        }
        let candidates = batch.candidates();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            requests = batch.requests.len(),
            candidates = candidates.len(),
            "Dispatching accumulated batch"
        );

        match self.dispatcher.dispatch(candidates).await {
            Ok(outcome) => {
                for request in batch.requests {
                    let slice = request.slice_of(&outcome);
                    request.waiter.resolve(slice);
                }
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "Accumulated dispatch failed");
                let err = Error::Dispatch(err);
                for request in batch.requests {
                    request.waiter.fail(err.clone());
                }
            }
        }
    }
}
