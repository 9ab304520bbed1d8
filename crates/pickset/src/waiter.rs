//! Single-use completion handles.
//!
//! A [`Waiter`] is the producer half held inside a pending batch; the caller
//! keeps the matching [`Completion`] future. Settling a waiter consumes it, so
//! no waiter can ever be resolved twice.

use crate::error::{Error, Result};
use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::sync::oneshot;

/// Producer side of one caller's outcome.
#[derive(Debug)]
pub(crate) struct Waiter<T> {
    tx: oneshot::Sender<Result<T>>,
}

impl<T> Waiter<T> {
    /// Creates a waiter together with the future its caller awaits.
    pub(crate) fn channel() -> (Self, Completion<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Self { tx },
            Completion {
                inner: Inner::Waiting(rx),
            },
        )
    }

    pub(crate) fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    pub(crate) fn fail(self, err: Error) {
        self.settle(Err(err));
    }

    pub(crate) fn settle(self, outcome: Result<T>) {
        // The caller may have stopped listening. Its request still ran.
        let _ = self.tx.send(outcome);
    }
}

/// Settles every waiter in `waiters` with a clone of `outcome`.
///
/// The last waiter receives `outcome` itself rather than a clone.
pub(crate) fn fan_out<T: Clone>(waiters: Vec<Waiter<T>>, outcome: Result<T>) {
    let mut waiters = waiters.into_iter().peekable();
    while let Some(waiter) = waiters.next() {
        if waiters.peek().is_none() {
            waiter.settle(outcome);
            return;
        }
        waiter.settle(outcome.clone());
    }
}

/// Future returned by every `enqueue` call.
///
/// The request has already been admitted into the current batch by the time
/// this value exists; awaiting it only waits for the batch to flush. Dropping
/// it does not withdraw the request.
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub struct Completion<T> {
    inner: Inner<T>,
}

#[derive(Debug)]
enum Inner<T> {
    Waiting(oneshot::Receiver<Result<T>>),
    Failed(Option<Error>),
}

impl<T> Completion<T> {
    /// A completion that has already failed without entering any batch.
    pub(crate) fn failed(err: Error) -> Self {
        Self {
            inner: Inner::Failed(Some(err)),
        }
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            Inner::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(Error::Abandoned))),
            Inner::Failed(err) => Poll::Ready(Err(err.take().unwrap_or(Error::Abandoned))),
        }
    }
}
