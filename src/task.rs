//! Microtask queue and execution
//!
//! Every notification a [Future](crate::Future) delivers is deferred onto a
//! per-thread queue of microtasks and only runs when that queue is driven.
//! Because each thread has its own queue:
//!
//! 1. A task always runs on the thread that queued it.
//! 2. Each thread that settles or observes futures needs to call one of
//!    [Executor::run], [Executor::tick] or [Executor::block_on] for any
//!    handler to run.
//!
//! # Example
//!
//! Tasks run strictly in the order they were queued, and never inline:
//!
//! ```
//! use aplus::task::Executor;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! for i in 0..3 {
//!     let log = log.clone();
//!     Executor::queue(move || log.borrow_mut().push(i));
//! }
//!
//! assert!(log.borrow().is_empty());
//! Executor::run();
//! assert_eq!(*log.borrow(), vec![0, 1, 2]);
//! ```
//!
//! [Executor::block_on] is the quickest way to get a future's outcome from a
//! synchronous context:
//!
//! ```
//! use aplus::{Future, task::Executor};
//!
//! let doubled = Future::<u32>::resolve(21u32).and_then(|v| Ok((v * 2).into()));
//! assert_eq!(Executor::block_on(&doubled), Ok(42));
//! ```
use std::{cell::RefCell, collections::VecDeque};

use log::{debug, trace};

use crate::{error::Error, future::Future};

struct Task {
    run: Box<dyn FnOnce()>,
}

/// The microtask executor.
///
/// A type that owns this thread's queue of deferred callbacks. It is never
/// constructed directly; all access goes through its associated functions.
pub struct Executor {
    run_q: VecDeque<Task>,
}

thread_local! {
    static EXEC: RefCell<Executor> = const { RefCell::new(
        Executor {
            run_q: VecDeque::new(),
        }
    )}
}

impl Executor {
    /// Append `f` to this thread's microtask queue. It will run after every
    /// task queued before it, and never before the caller returns control to
    /// whichever loop drives the queue.
    pub fn queue(f: impl FnOnce() + 'static) {
        EXEC.with(|exec| {
            exec.borrow_mut().run_q.push_back(Task { run: Box::new(f) });
        });
    }

    /// Run the oldest queued task, if any. Returns `false` when the queue was
    /// already empty.
    pub fn tick() -> bool {
        // The borrow must be released before the task runs; tasks routinely
        // queue more tasks.
        let task = EXEC.with(|exec| exec.borrow_mut().run_q.pop_front());

        match task {
            Some(task) => {
                (task.run)();
                true
            }
            None => false,
        }
    }

    /// Run queued tasks, including any they queue in turn, until the queue is
    /// empty.
    pub fn run() {
        let mut ran = 0usize;

        while Self::tick() {
            ran += 1;
        }

        trace!("microtask queue drained after {ran} tasks");
    }

    /// Number of tasks currently waiting in this thread's queue.
    pub fn pending() -> usize {
        EXEC.with(|exec| exec.borrow().run_q.len())
    }

    /// Drive the queue until `future` settles and return its outcome.
    ///
    /// There are no timers or I/O sources, so if the queue runs dry while
    /// `future` is still pending nothing can ever settle it; in that case
    /// [Error::Stalled] is returned as the rejection reason.
    pub fn block_on<T, E>(future: &Future<T, E>) -> Result<T, E>
    where
        T: Clone + 'static,
        E: Clone + From<Error> + 'static,
    {
        loop {
            if let Some(outcome) = future.settled() {
                return outcome;
            }

            if !Self::tick() {
                debug!("block_on: future {} stalled", future.id());
                return Err(Error::Stalled(future.id()).into());
            }
        }
    }
}
