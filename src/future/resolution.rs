//! Thenable resolution.
//!
//! Resolving a future with a value is not always the same as fulfilling it:
//! if the value is itself a [Thenable], the future instead *adopts* that
//! thenable's eventual outcome. Whatever the thenable passes to its resolve
//! entry point is run through the same procedure again, so arbitrarily deep
//! chains of thenables unwrap down to a plain value.
use std::{fmt, rc::Rc};

use log::debug;

use super::{Future, FutureId, Outcome, State};
use crate::{error::Error, settle_guard::Guarded};

/// Guarded entry point that resolves a future.
pub type Resolve<T, E> = Guarded<Resolution<T, E>>;

/// Guarded entry point that rejects a future.
pub type Reject<E> = Guarded<E>;

/// Anything with a `then` that eventually calls back one of the two entry
/// points it is given.
///
/// [Future] implements this, and so can any foreign future-like type that
/// should interoperate with it. The entry points are guarded, so an
/// implementation that calls both, or calls one several times, only has its
/// first call honoured.
pub trait Thenable<T, E> {
    /// Arrange for `resolve` or `reject` to be called once the outcome is
    /// known. Returning `Err` counts as a failure of `then` itself: the
    /// resolving future is rejected with it, unless an entry point was
    /// already called.
    fn then(&self, resolve: Resolve<T, E>, reject: Reject<E>) -> Result<(), E>;

    /// The identity of the underlying [Future], if this thenable is one.
    /// Used to refuse resolving a future with itself.
    fn future_id(&self) -> Option<FutureId> {
        None
    }
}

/// A value to resolve a future with: either a plain value or a thenable whose
/// outcome is adopted.
pub enum Resolution<T, E> {
    Value(T),
    Thenable(Rc<dyn Thenable<T, E>>),
}

impl<T, E> Resolution<T, E> {
    pub fn thenable(thenable: impl Thenable<T, E> + 'static) -> Self {
        Self::Thenable(Rc::new(thenable))
    }
}

impl<T, E> From<T> for Resolution<T, E> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}

impl<T: fmt::Debug, E> fmt::Debug for Resolution<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Resolution::Thenable(thenable) => match thenable.future_id() {
                Some(id) => write!(f, "Thenable({id})"),
                None => f.write_str("Thenable(..)"),
            },
        }
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    pub(super) fn resolve_with(&self, value: Resolution<T, E>) {
        if let Resolution::Thenable(thenable) = &value {
            if thenable.future_id() == Some(self.id()) {
                debug!("future {} resolved with itself", self.id());
                return self.reject_with(Error::ChainingCycle(self.id()).into());
            }
        }

        let thenable = match value {
            Resolution::Value(value) => return self.settle(State::Fulfilled(value)),
            Resolution::Thenable(thenable) => thenable,
        };

        let (resolve, reject) = self.entry_points();

        if let Err(reason) = thenable.then(resolve.clone(), reject.clone()) {
            if resolve.fired() {
                debug!("thenable failed after settling future {}; ignoring", self.id());
                return;
            }

            debug!("thenable failed while resolving future {}", self.id());
            // Through the guard, so the thenable cannot settle this future
            // later on.
            reject.call(reason);
        }
    }

    pub(super) fn reject_with(&self, reason: E) {
        self.settle(State::Rejected(reason))
    }
}

impl<T, E> Thenable<T, E> for Future<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    fn then(&self, resolve: Resolve<T, E>, reject: Reject<E>) -> Result<(), E> {
        Future::then(
            self,
            Some(Box::new(move |value: T| -> Outcome<T, E> {
                resolve.call(value.clone());
                Ok(value.into())
            })),
            Some(Box::new(move |reason: E| -> Outcome<T, E> {
                reject.call(reason.clone());
                Err(reason)
            })),
        );

        Ok(())
    }

    fn future_id(&self) -> Option<FutureId> {
        Some(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::{Reject, Resolution, Resolve, Thenable};
    use crate::{error::Error, future::Future, task::Executor};
    use std::{cell::RefCell, rc::Rc};

    /// Settles synchronously, then misbehaves in every way it can.
    struct Unruly;

    impl Thenable<u32, Error> for Unruly {
        fn then(&self, resolve: Resolve<u32, Error>, reject: Reject<Error>) -> Result<(), Error> {
            resolve.call(7u32);
            reject.call("second");
            resolve.call(8u32);
            Err("thrown".into())
        }
    }

    /// Fails before calling anything, but keeps the entry points around.
    #[derive(Default)]
    struct Failing {
        kept: RefCell<Option<Resolve<u32, Error>>>,
    }

    impl Thenable<u32, Error> for Rc<Failing> {
        fn then(&self, resolve: Resolve<u32, Error>, _: Reject<Error>) -> Result<(), Error> {
            *self.kept.borrow_mut() = Some(resolve);
            Err("thrown".into())
        }
    }

    #[test]
    fn first_call_from_thenable_wins() {
        let fut = Future::<u32>::resolve(Resolution::thenable(Unruly));

        assert_eq!(fut.settled(), Some(Ok(7)));
    }

    #[test]
    fn failing_thenable_rejects() {
        let failing = Rc::new(Failing::default());
        let fut = Future::<u32>::resolve(Resolution::thenable(failing.clone()));

        assert_eq!(fut.settled(), Some(Err(Error::from("thrown"))));

        let kept = failing.kept.borrow_mut().take();
        if let Some(resolve) = kept {
            resolve.call(1u32);
        }
        assert_eq!(fut.settled(), Some(Err(Error::from("thrown"))));
    }

    #[test]
    fn adopts_pending_future() {
        let inner = Future::<u32>::deferred();
        let outer = Future::<u32>::resolve(Resolution::thenable(inner.promise.clone()));

        Executor::run();
        assert_eq!(outer.settled(), None);

        inner.resolve.call(9u32);
        Executor::run();
        assert_eq!(outer.settled(), Some(Ok(9)));
    }

    #[test]
    fn adopts_rejection() {
        let outer = Future::<u32>::resolve(Resolution::thenable(Future::<u32>::reject("no")));

        Executor::run();
        assert_eq!(outer.settled(), Some(Err(Error::from("no"))));
    }

    #[test]
    fn self_resolution_is_a_cycle() {
        let deferred = Future::<u32>::deferred();
        deferred
            .resolve
            .call(Resolution::thenable(deferred.promise.clone()));

        assert_eq!(
            deferred.promise.settled(),
            Some(Err(Error::ChainingCycle(deferred.promise.id())))
        );
    }

    #[test]
    fn debug_formats() {
        let value: Resolution<u32, Error> = 4u32.into();
        assert_eq!(format!("{value:?}"), "Value(4)");

        let fut = Future::<u32>::resolve(1u32);
        let thenable: Resolution<u32, Error> = Resolution::thenable(fut.clone());
        assert_eq!(format!("{thenable:?}"), format!("Thenable({})", fut.id()));
    }
}
