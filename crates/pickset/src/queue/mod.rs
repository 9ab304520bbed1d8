//! The three coalescing queue variants.
//!
//! All of them share one batch-window protocol: the first enqueue
//! into an empty queue arms a timer, later enqueues join the pending batch
//! without touching the timer, and the timer drains the batch atomically and
//! hands it to the dispatcher outside the lock.
//!
//! - [`KeyedLatestQueue`]: one request per key, latest wins, shared result.
//! - [`AccumulatingSetQueue`]: union of items, per-caller outcome slices.
//! - [`SinglePayloadQueue`]: one payload, last write wins, shared result.

mod accumulate;
mod keyed;
mod single;

#[cfg(test)]
mod tests;

pub use accumulate::AccumulatingSetQueue;
pub use keyed::KeyedLatestQueue;
pub use single::SinglePayloadQueue;
