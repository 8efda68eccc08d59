//! One-shot settlement guards.
//!
//! A [SettleGuard] ties two completion callbacks together so that only the
//! *first* call through either of them has any effect. Every later call, via
//! either path, is swallowed without error. This is what makes a future settle
//! at most once even when a producer (or a foreign thenable) calls both
//! completion paths, calls one twice, or calls one re-entrantly from inside
//! the other.
//!
//! # Example
//!
//! ```
//! use aplus::settle_guard::SettleGuard;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let (ok, err) = SettleGuard::pair(
//!     log.clone(),
//!     |log: &Rc<RefCell<Vec<String>>>, v: u32| log.borrow_mut().push(format!("ok {v}")),
//!     |log: &Rc<RefCell<Vec<String>>>, e: String| log.borrow_mut().push(format!("err {e}")),
//! );
//!
//! ok.call(1u32);
//! err.call("boom");
//! ok.call(2u32);
//!
//! assert_eq!(*log.borrow(), vec!["ok 1".to_string()]);
//! ```
use std::{cell::Cell, fmt, rc::Rc};

use log::trace;

/// The shared "has anything been called yet" flag behind a pair of
/// [Guarded] entry points.
///
/// A guard only exists as part of a pair; there is no way to build one that
/// is wired to nothing:
///
/// ```compile_fail
/// let guard = aplus::settle_guard::SettleGuard::default();
/// ```
#[derive(Debug)]
pub struct SettleGuard {
    fired: Cell<bool>,
}

impl SettleGuard {
    /// Wrap `on_fulfill` and `on_reject` so that at most one call through
    /// either wrapper reaches its callback. Both callbacks receive `context`
    /// as their receiver.
    pub fn pair<C, A, B>(
        context: C,
        on_fulfill: impl Fn(&C, A) + 'static,
        on_reject: impl Fn(&C, B) + 'static,
    ) -> (Guarded<A>, Guarded<B>)
    where
        C: 'static,
        A: 'static,
        B: 'static,
    {
        let guard = Rc::new(SettleGuard::unfired());
        let context = Rc::new(context);

        let fulfill = {
            let context = context.clone();
            Guarded {
                guard: guard.clone(),
                callback: Rc::new(move |value| on_fulfill(&context, value)),
            }
        };

        let reject = Guarded {
            guard,
            callback: Rc::new(move |reason| on_reject(&context, reason)),
        };

        (fulfill, reject)
    }

    /// Whether either path of this guard has been called.
    pub fn fired(&self) -> bool {
        self.fired.get()
    }

    fn unfired() -> Self {
        Self {
            fired: Cell::new(false),
        }
    }

    fn claim(&self) -> bool {
        !self.fired.replace(true)
    }
}

/// One guarded completion entry point.
///
/// Cloning a `Guarded` yields another handle to the *same* entry point; all
/// clones share the guard with the sibling path.
pub struct Guarded<A> {
    guard: Rc<SettleGuard>,
    callback: Rc<dyn Fn(A)>,
}

impl<A> Guarded<A> {
    /// Invoke the wrapped callback with `arg`, unless this guard (through
    /// either path) has already been called. Redundant calls are no-ops.
    pub fn call(&self, arg: impl Into<A>) {
        // The flag is set before the callback runs, so re-entrant calls from
        // inside the callback are swallowed too.
        if !self.guard.claim() {
            trace!("settle guard already fired; ignoring call");
            return;
        }

        (self.callback)(arg.into())
    }

    /// Whether this entry point or its sibling has been called.
    pub fn fired(&self) -> bool {
        self.guard.fired()
    }
}

impl<A> Clone for Guarded<A> {
    fn clone(&self) -> Self {
        Self {
            guard: self.guard.clone(),
            callback: self.callback.clone(),
        }
    }
}

impl<A> fmt::Debug for Guarded<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Guarded")
            .field("fired", &self.fired())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::SettleGuard;
    use std::{cell::RefCell, rc::Rc};

    type Log = Rc<RefCell<Vec<String>>>;

    fn logging_pair(log: &Log) -> (super::Guarded<u32>, super::Guarded<u32>) {
        SettleGuard::pair(
            log.clone(),
            |log: &Log, v: u32| log.borrow_mut().push(format!("f{v}")),
            |log: &Log, v: u32| log.borrow_mut().push(format!("r{v}")),
        )
    }

    #[test]
    fn pair_starts_unfired() {
        let log = Log::default();
        let (f, r) = logging_pair(&log);

        assert!(!f.fired());
        assert!(!r.fired());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn first_fulfill_wins() {
        let log = Log::default();
        let (f, r) = logging_pair(&log);

        assert!(!f.fired());
        f.call(1u32);
        f.call(2u32);
        r.call(3u32);

        assert!(f.fired() && r.fired());
        assert_eq!(*log.borrow(), vec!["f1"]);
    }

    #[test]
    fn first_reject_wins() {
        let log = Log::default();
        let (f, r) = logging_pair(&log);

        r.call(7u32);
        f.call(8u32);

        assert_eq!(*log.borrow(), vec!["r7"]);
    }

    #[test]
    fn clones_share_the_guard() {
        let log = Log::default();
        let (f, r) = logging_pair(&log);
        let f2 = f.clone();

        f2.call(4u32);
        f.call(5u32);
        r.call(6u32);

        assert_eq!(*log.borrow(), vec!["f4"]);
    }

    #[test]
    fn reentrant_call_is_swallowed() {
        let log = Log::default();
        let slot: Rc<RefCell<Option<super::Guarded<u32>>>> = Rc::default();

        let (f, r) = SettleGuard::pair(
            (log.clone(), slot.clone()),
            |(log, slot): &(Log, Rc<RefCell<Option<super::Guarded<u32>>>>), v: u32| {
                log.borrow_mut().push(format!("f{v}"));
                let sibling = slot.borrow().clone();
                if let Some(reject) = sibling {
                    reject.call(v + 1);
                }
            },
            |(log, _): &(Log, Rc<RefCell<Option<super::Guarded<u32>>>>), v: u32| {
                log.borrow_mut().push(format!("r{v}"));
            },
        );

        *slot.borrow_mut() = Some(r);
        f.call(1u32);

        assert_eq!(*log.borrow(), vec!["f1"]);
    }
}
