use crate::{
    dispatch::{Keyed, KeyedDispatch},
    error::Error,
    waiter::{Completion, Waiter, fan_out},
    window::{Batch, Window, current_runtime},
};
use core::time::Duration;
use std::{collections::HashMap, sync::Arc};

/// Coalesces requests by key, keeping only the latest request per key.
///
/// Callers submit requests tagged with a key (see [`Keyed`]). Submissions for
/// a key that is already pending replace the pending request, and the new
/// caller joins the waiters of that key. When the window elapses, the
/// dispatcher runs once with the most recent request of every distinct key,
/// and every waiter of a key receives that key's result.
///
/// Suited to read-style lookups where only the latest ask matters, such as
/// "page N under filter F" issued on every keystroke.
///
/// Cloning the queue yields another handle to the same pending state.
pub struct KeyedLatestQueue<R, D>
where
    D: KeyedDispatch<R>,
{
    shared: Arc<Shared<R, D>>,
}

impl<R, D> Clone for KeyedLatestQueue<R, D>
where
    D: KeyedDispatch<R>,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<R, D>
where
    D: KeyedDispatch<R>,
{
    window: Window<KeyedBatch<R, D::Output>>,
    dispatcher: D,
}

struct Entry<R, T> {
    key: String,
    request: R,
    waiters: Vec<Waiter<T>>,
}

/// Pending entries in order of each key's first arrival.
struct KeyedBatch<R, T> {
    entries: Vec<Entry<R, T>>,
    index: HashMap<String, usize>,
}

impl<R, T> Default for KeyedBatch<R, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<R: Send + 'static, T: Send + 'static> Batch for KeyedBatch<R, T> {
    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<R, T> KeyedBatch<R, T> {
    fn upsert(&mut self, key: String, request: R, waiter: Waiter<T>) {
        match self.index.get(&key) {
            Some(&slot) => {
                let entry = &mut self.entries[slot];
                entry.request = request;
                entry.waiters.push(waiter);
            }
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push(Entry {
                    key,
                    request,
                    waiters: vec![waiter],
                });
            }
        }
    }
}

impl<R, D> KeyedLatestQueue<R, D>
where
    R: Keyed + Send + 'static,
    D: KeyedDispatch<R>,
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

    /// Submits `request` into the current batch.
    ///
    /// Admission happens before this returns; the returned future resolves
    /// once the batch has been dispatched. A request with an empty key fails
    /// immediately with [`Error::Validation`] and never reaches the
    /// dispatcher.
    pub fn enqueue(&self, request: R) -> Completion<D::Output> {
        if request.key().is_empty() {
            return Completion::failed(Error::validation("request key must not be empty"));
        }
        let Some(runtime) = current_runtime() else {
            return Completion::failed(Error::NoRuntime);
        };

        let key = request.key().to_owned();
        let (waiter, completion) = Waiter::channel();
        let shared = Arc::clone(&self.shared);
        self.shared.window.admit(
            &runtime,
            |batch| batch.upsert(key, request, waiter),
            move || shared.flush(),
        );
        completion
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.shared.window.is_armed()
    }
}

impl<R, D> Shared<R, D>
where
    R: Keyed + Send + 'static,
    D: KeyedDispatch<R>,
{
    async fn flush(self: Arc<Self>) {
        let batch = self.window.drain();
        if batch.is_empty() {
            return;
        }

        let mut requests = Vec::with_capacity(batch.entries.len());
        let mut waiting = Vec::with_capacity(batch.entries.len());
        for entry in batch.entries {
            requests.push(entry.request);
            waiting.push((entry.key, entry.waiters));
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            keys = waiting.len(),
            waiters = waiting.iter().map(|(_, w)| w.len()).sum::<usize>(),
            "Dispatching keyed batch"
        );

        match self.dispatcher.dispatch(requests).await {
            Ok(mut results) => {
                for (key, waiters) in waiting {
                    match results.remove(&key) {
                        Some(result) => fan_out(waiters, Ok(result)),
                        None => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(key = %key, "Dispatcher omitted a requested key");
                            fan_out(waiters, Err(Error::MissingResult { key }));
                        }
                    }
                }
            }
            Err(err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %err, "Keyed dispatch failed");
                let err = Error::Dispatch(err);
                for (_, waiters) in waiting {
                    fan_out(waiters, Err(err.clone()));
                }
            }
        }
    }
}
