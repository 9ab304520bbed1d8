use crate::{
    dispatch::PayloadDispatch,
    error::Error,
    waiter::{Completion, Waiter, fan_out},
    window::{Batch, Window, current_runtime},
};
use core::time::Duration;
use std::sync::Arc;

/// Last-write-wins coalescing of whole-replacement payloads.
///
/// Only the most recently submitted payload of a window reaches the
/// dispatcher. Every caller of that window, including callers whose payload
/// was superseded, resolves with the result of the one dispatch.
///
/// Suited to state that is replaced wholesale, like an ordered selection after
/// a drag-reorder, where intermediate states are safe to discard.
pub struct SinglePayloadQueue<P, D>
where
    D: PayloadDispatch<P>,
{
    shared: Arc<Shared<P, D>>,
}

impl<P, D> Clone for SinglePayloadQueue<P, D>
where
    D: PayloadDispatch<P>,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<P, D>
where
    D: PayloadDispatch<P>,
{
    window: Window<PayloadSlot<P, D::Output>>,
    dispatcher: D,
}

struct Pending<P, T> {
    payload: P,
    waiters: Vec<Waiter<T>>,
}

/// At most one pending payload together with everyone waiting on it.
struct PayloadSlot<P, T>(Option<Pending<P, T>>);

impl<P, T> Default for PayloadSlot<P, T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<P: Send + 'static, T: Send + 'static> Batch for PayloadSlot<P, T> {
    fn len(&self) -> usize {
        self.0.as_ref().map_or(0, |pending| pending.waiters.len())
    }
}

impl<P, T> PayloadSlot<P, T> {
    fn replace(&mut self, payload: P, waiter: Waiter<T>) {
        match &mut self.0 {
            Some(pending) => {
                pending.payload = payload;
                pending.waiters.push(waiter);
            }
            None => {
                self.0 = Some(Pending {
                    payload,
                    waiters: vec![waiter],
                });
            }
        }
    }
}

impl<P, D> SinglePayloadQueue<P, D>
where
    P: Send + 'static,
    D: PayloadDispatch<P>,
{
    /// Creates a queue that flushes `window` after the first pending payload.
    pub fn new(window: Duration, dispatcher: D) -> Self {
        Self {
            shared: Arc::new(Shared {
                window: Window::new(window),
                dispatcher,
            }),
        }
    }

    /// Submits `payload`, superseding any payload already pending.
    ///
    /// Resolves with the dispatcher's result for the final payload of the
    /// window. A payload refused by [`PayloadDispatch::validate`] fails
    /// immediately with [`Error::Validation`] and does not displace the
    /// pending one.
    pub fn enqueue(&self, payload: P) -> Completion<D::Output> {
        if let Err(reason) = self.shared.dispatcher.validate(&payload) {
            return Completion::failed(Error::Validation { reason });
        }
        let Some(runtime) = current_runtime() else {
            return Completion::failed(Error::NoRuntime);
        };

        let (waiter, completion) = Waiter::channel();
        let shared = Arc::clone(&self.shared);
        self.shared.window.admit(
            &runtime,
            |slot| slot.replace(payload, waiter),
            move || shared.flush(),
        );
        completion
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        self.shared.window.is_armed()
    }

    #[cfg(test)]
    pub(crate) async fn flush_now(&self) {
        Arc::clone(&self.shared).flush().await;
    }
}

impl<P, D> Shared<P, D>
where
    P: Send + 'static,
    D: PayloadDispatch<P>,
{
    async fn flush(self: Arc<Self>) {
        let Some(Pending { payload, waiters }) = self.window.drain().0 else {
            #[cfg(feature = "tracing")]
            tracing::trace!("Flush found no pending payload");
            return;
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(waiters = waiters.len(), "Dispatching latest payload");

        let outcome = self.dispatcher.dispatch(payload).await.map_err(|err| {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %err, "Payload dispatch failed");
            Error::Dispatch(err)
        });
        fan_out(waiters, outcome);
    }
}
