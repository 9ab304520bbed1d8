//! The batch window shared by every queue variant.
//!
//! A [`Window`] owns a queue's pending state and its timer handle behind one
//! mutex. The invariant it maintains is that a timer is armed iff the pending
//! state is non-empty:
//!
//! - [`Window::admit`] inserts under the lock and arms the timer only when none
//!   is armed. Later arrivals never push the deadline out, so a cycle resolves
//!   no later than one window after its first arrival.
//! - [`Window::drain`] swaps the pending state for an empty one and disarms
//!   the timer under the lock. The dispatcher runs after the lock is released,
//!   so arrivals during dispatch start a fresh cycle with a fresh timer.
//!
//! The lock is a `parking_lot::Mutex` and is never held across an `.await`.

use core::{future::Future, mem, time::Duration};
use parking_lot::Mutex;
use tokio::{runtime::Handle, task::AbortHandle};

/// Pending state of one queue variant.
pub(crate) trait Batch: Default + Send + 'static {
    /// Number of logical entries currently pending.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Slot<P> {
    pending: P,
    timer: Option<AbortHandle>,
}

pub(crate) struct Window<P> {
    period: Duration,
    slot: Mutex<Slot<P>>,
}

impl<P: Batch> Window<P> {
    pub(crate) fn new(period: Duration) -> Self {
        Self {
            period,
            slot: Mutex::new(Slot {
                pending: P::default(),
                timer: None,
            }),
        }
    }

    /// Inserts into the pending state and arms the timer if it is not armed.
    ///
    /// `insert` runs under the lock. `on_fire` is only invoked when a new timer
    /// is armed; the future it returns runs once the window elapses and is
    /// expected to call [`Window::drain`].
    pub(crate) fn admit<R, F, Fut>(
        &self,
        runtime: &Handle,
        insert: impl FnOnce(&mut P) -> R,
        on_fire: F,
    ) -> R
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        let admitted = insert(&mut slot.pending);
        debug_assert!(!slot.pending.is_empty());

        if slot.timer.is_none() {
            let period = self.period;
            let flush = on_fire();
            let task = runtime.spawn(async move {
                tokio::time::sleep(period).await;
                flush.await;
            });
            slot.timer = Some(task.abort_handle());

            #[cfg(feature = "tracing")]
            tracing::trace!(window_ms = period.as_millis() as u64, "Armed batch timer");
        }

        admitted
    }

    /// Atomically takes everything pending and disarms the timer.
    ///
    /// Returns an empty batch when nothing was pending, which callers treat as
    /// a no-op.
    pub(crate) fn drain(&self) -> P {
        let mut slot = self.slot.lock();
        // The handle belongs to the task calling us, so it is dropped rather
        // than aborted.
        slot.timer = None;
        mem::take(&mut slot.pending)
    }

    #[cfg(test)]
    pub(crate) fn is_armed(&self) -> bool {
        let slot = self.slot.lock();
        debug_assert_eq!(slot.timer.is_some(), !slot.pending.is_empty());
        slot.timer.is_some()
    }
}

/// Returns the runtime to arm batch timers on, if the caller is inside one.
pub(crate) fn current_runtime() -> Option<Handle> {
    Handle::try_current().ok()
}
