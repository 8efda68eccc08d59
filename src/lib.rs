//! # `aplus`: settle-once deferred values
//!
//! This crate implements a deferred value, a [Future], that follows the
//! Promises/A+ interoperability contract. A future starts out empty, is
//! settled exactly once to a success value or a failure reason, and lets any
//! number of observers attach handlers before or after settlement. Every
//! observer is notified exactly once, asynchronously, in subscription order.
//!
//! Everything is single-threaded. Notifications are deferred onto a per-thread
//! microtask queue which has to be driven explicitly; see the [task] module.
//! The [settle_guard] module provides the one-shot guard that keeps a future
//! from ever settling twice, and the [future] module holds the rest.
//!
//! ## Example
//!
//! Chain a few links and read the outcome off the end:
//!
//! ```
//! use aplus::{Future, Resolution, task::Executor};
//!
//! let inner = Future::<u32>::deferred();
//! let outer = Future::<u32>::new(|resolve, _| {
//!     // Adopt whatever `inner` settles to.
//!     resolve.call(Resolution::thenable(inner.promise.clone()));
//!     Ok(())
//! });
//!
//! let end = outer.and_then(|v| Ok((v + 1).into()));
//!
//! inner.resolve.call(1u32);
//! assert_eq!(Executor::block_on(&end), Ok(2));
//! ```
mod error;
pub mod future;
pub mod settle_guard;
pub mod task;

pub use error::Error;
pub use future::{
    Deferred, Future, FutureId, OnFulfilled, OnRejected, Outcome, Reject, Resolution, Resolve,
    Status, Thenable,
};
pub use task::Executor;
