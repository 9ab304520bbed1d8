#![doc = include_str!("../README.md")]

mod dispatch;
mod error;
mod queue;
mod waiter;
mod window;

pub use crate::dispatch::*;
pub use crate::error::*;
pub use crate::queue::*;
pub use crate::waiter::Completion;
