//! The settle-once deferred value.
//!
//! A [Future] starts out [Status::Pending] and is settled exactly once, either
//! fulfilled with a value or rejected with a reason. Any number of observers
//! can subscribe with [Future::then], before or after settlement; each one is
//! notified exactly once, on a later [Executor](crate::task::Executor) turn,
//! in the order it subscribed.
//!
//! Every `then` returns a new downstream future that settles with whatever its
//! handler produces. A handler may return a plain value, another future (or
//! any foreign [Thenable]), or an `Err` to reject the downstream link. A link
//! without a matching handler passes the parent's outcome through unchanged.
//!
//! # Example
//!
//! ```
//! use aplus::{Error, Future, Status, task::Executor};
//!
//! let fut = Future::<u32>::new(|resolve, _reject| {
//!     resolve.call(1u32);
//!     Ok(())
//! });
//!
//! let next = fut
//!     .and_then(|v| Ok((v + 1).into()))
//!     .and_then(|v| if v == 2 { Err(Error::from("two")) } else { Ok(v.into()) })
//!     .catch(|reason| {
//!         let recovered = if reason == Error::from("two") { 20 } else { 0 };
//!         Ok(recovered.into())
//!     });
//!
//! assert_eq!(next.status(), Status::Pending);
//! Executor::run();
//! assert_eq!(next.settled(), Some(Ok(20)));
//! ```
use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc};

use log::{debug, trace};

use crate::{error::Error, settle_guard::SettleGuard};

mod observer;
mod resolution;

use observer::Observer;
pub use resolution::{Reject, Resolution, Resolve, Thenable};

/// What a handler hands back: a value (or thenable) to resolve the downstream
/// future with, or `Err` to reject it.
pub type Outcome<T, E = Error> = Result<Resolution<T, E>, E>;

/// A success handler attached by [Future::then].
pub type OnFulfilled<T, E = Error> = Box<dyn FnOnce(T) -> Outcome<T, E>>;

/// A failure handler attached by [Future::then].
pub type OnRejected<T, E = Error> = Box<dyn FnOnce(E) -> Outcome<T, E>>;

/// The settlement status of a [Future]. Once it leaves `Pending` it never
/// changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

/// An opaque identity token for a [Future].
///
/// Two handles compare equal exactly when they refer to the same future.
/// Tokens are only meaningful while the future they came from is alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FutureId(usize);

impl fmt::Display for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:x}", self.0)
    }
}

impl fmt::Debug for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FutureId({self})")
    }
}

enum State<T, E> {
    Pending,
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> State<T, E> {
    fn status(&self) -> Status {
        match self {
            State::Pending => Status::Pending,
            State::Fulfilled(_) => Status::Fulfilled,
            State::Rejected(_) => Status::Rejected,
        }
    }
}

impl<T: Clone, E: Clone> State<T, E> {
    fn outcome(&self) -> Option<Result<T, E>> {
        match self {
            State::Pending => None,
            State::Fulfilled(value) => Some(Ok(value.clone())),
            State::Rejected(reason) => Some(Err(reason.clone())),
        }
    }
}

struct Inner<T, E> {
    state: State<T, E>,
    observers: VecDeque<Observer<T, E>>,
    // Set by the parent's `then` when this future is a chain link.
    on_fulfilled: Option<OnFulfilled<T, E>>,
    on_rejected: Option<OnRejected<T, E>>,
}

impl<T, E> Drop for Inner<T, E> {
    fn drop(&mut self) {
        // Each observer owns the next link of its chain. Dropping them in
        // place recurses once per link, so unlink the chain iteratively.
        let mut unlinked: Vec<Observer<T, E>> = self.observers.drain(..).collect();

        while let Some(observer) = unlinked.pop() {
            let Observer {
                downstream,
                resolve,
                reject,
            } = observer;

            // The entry points hold references to `downstream` as well.
            drop(resolve);
            drop(reject);

            if let Ok(link) = Rc::try_unwrap(downstream.inner) {
                let mut link = link.into_inner();
                unlinked.extend(link.observers.drain(..));
            }
        }
    }
}

/// A single-threaded, settle-once deferred value.
///
/// `Future` is a cheap handle: clones refer to the same underlying state.
/// See the [module-level documentation](self) for more information.
pub struct Future<T, E = Error> {
    inner: Rc<RefCell<Inner<T, E>>>,
}

/// A future together with the two entry points that settle it. Returned by
/// [Future::deferred].
pub struct Deferred<T, E = Error> {
    pub promise: Future<T, E>,
    pub resolve: Resolve<T, E>,
    pub reject: Reject<E>,
}

impl<T, E> Future<T, E> {
    /// The identity of this future.
    pub fn id(&self) -> FutureId {
        FutureId(Rc::as_ptr(&self.inner).cast::<()>() as usize)
    }

    /// The current settlement status.
    pub fn status(&self) -> Status {
        self.inner.borrow().state.status()
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Create a new future and immediately hand `producer` the two guarded
    /// entry points that settle it.
    ///
    /// Only the first call through either entry point has any effect. If
    /// `producer` returns `Err` before settling the future, the future is
    /// rejected with that reason; an `Err` returned after settlement is
    /// ignored.
    pub fn new(producer: impl FnOnce(Resolve<T, E>, Reject<E>) -> Result<(), E>) -> Self {
        let future = Self::unsettled();
        let (resolve, reject) = future.entry_points();

        if let Err(reason) = producer(resolve, reject.clone()) {
            if !reject.fired() {
                debug!("producer for future {} failed; rejecting", future.id());
            }
            reject.call(reason);
        }

        future
    }

    /// Create a pending future and expose its entry points to the caller.
    pub fn deferred() -> Deferred<T, E> {
        let promise = Self::unsettled();
        let (resolve, reject) = promise.entry_points();

        Deferred {
            promise,
            resolve,
            reject,
        }
    }

    /// A future resolved with `value`. If `value` is a thenable, the new
    /// future adopts its eventual outcome.
    pub fn resolve(value: impl Into<Resolution<T, E>>) -> Self {
        let deferred = Self::deferred();
        deferred.resolve.call(value);
        deferred.promise
    }

    /// A future rejected with `reason`.
    pub fn reject(reason: impl Into<E>) -> Self {
        let deferred = Self::deferred();
        deferred.reject.call(reason);
        deferred.promise
    }

    /// Subscribe to the outcome of this future.
    ///
    /// Returns a new downstream future straight away, whatever the current
    /// status. Once this future settles, the matching handler is called with
    /// the value or reason and the downstream future is resolved with its
    /// [Outcome]. When the matching handler is `None`, the outcome passes
    /// through to the downstream future unchanged.
    ///
    /// Handlers never run inside this call, even when this future has already
    /// settled; they run on a later executor turn.
    pub fn then(
        &self,
        on_fulfilled: Option<OnFulfilled<T, E>>,
        on_rejected: Option<OnRejected<T, E>>,
    ) -> Future<T, E> {
        let Deferred {
            promise,
            resolve,
            reject,
        } = Self::deferred();

        {
            let mut link = promise.inner.borrow_mut();
            link.on_fulfilled = on_fulfilled;
            link.on_rejected = on_rejected;
        }

        self.inner.borrow_mut().observers.push_back(Observer {
            downstream: promise.clone(),
            resolve,
            reject,
        });

        self.trigger_observers();

        promise
    }

    /// Shorthand for `then(Some(f), None)`.
    pub fn and_then<F>(&self, f: F) -> Future<T, E>
    where
        F: FnOnce(T) -> Outcome<T, E> + 'static,
    {
        self.then(Some(Box::new(f)), None)
    }

    /// Shorthand for `then(None, Some(f))`.
    pub fn catch<F>(&self, f: F) -> Future<T, E>
    where
        F: FnOnce(E) -> Outcome<T, E> + 'static,
    {
        self.then(None, Some(Box::new(f)))
    }

    /// The settled value or reason, or `None` while still pending.
    pub fn settled(&self) -> Option<Result<T, E>> {
        self.inner.borrow().state.outcome()
    }

    fn unsettled() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending,
                observers: VecDeque::new(),
                on_fulfilled: None,
                on_rejected: None,
            })),
        }
    }

    /// A fresh pair of guarded entry points onto this future's resolve and
    /// reject procedures.
    fn entry_points(&self) -> (Resolve<T, E>, Reject<E>) {
        SettleGuard::pair(self.clone(), Self::resolve_with, Self::reject_with)
    }

    fn settle(&self, state: State<T, E>) {
        {
            let mut inner = self.inner.borrow_mut();

            if !matches!(inner.state, State::Pending) {
                trace!("future {} already settled; ignoring", self.id());
                return;
            }

            trace!("future {} settled: {:?}", self.id(), state.status());
            inner.state = state;
        }

        self.trigger_observers();
    }
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Future<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("id", &self.id())
            .field("status", &self.status())
            .finish()
    }
}
