use log::trace;

use super::{Future, Reject, Resolve, Status};
use crate::{error::Error, task::Executor};

/// One `then` subscription: the downstream link waiting on a parent, and the
/// entry points that settle it.
pub(super) struct Observer<T, E> {
    pub(super) downstream: Future<T, E>,
    pub(super) resolve: Resolve<T, E>,
    pub(super) reject: Reject<E>,
}

impl<T, E> Observer<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    fn notify(self, outcome: Result<T, E>) {
        let Observer {
            downstream,
            resolve,
            reject,
        } = self;

        match outcome {
            Ok(value) => {
                let handler = downstream.inner.borrow_mut().on_fulfilled.take();

                match handler {
                    Some(handler) => match handler(value) {
                        Ok(resolution) => resolve.call(resolution),
                        Err(reason) => reject.call(reason),
                    },
                    None => resolve.call(value),
                }
            }
            Err(reason) => {
                let handler = downstream.inner.borrow_mut().on_rejected.take();

                match handler {
                    Some(handler) => match handler(reason) {
                        Ok(resolution) => resolve.call(resolution),
                        Err(reason) => reject.call(reason),
                    },
                    None => reject.call(reason),
                }
            }
        }
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + 'static,
    E: Clone + From<Error> + 'static,
{
    /// Schedule a drain of the observer queue, unless still pending.
    pub(super) fn trigger_observers(&self) {
        if self.status() == Status::Pending {
            return;
        }

        let this = self.clone();
        Executor::queue(move || this.drain_observers());
    }

    fn drain_observers(&self) {
        let mut notified = 0usize;

        loop {
            // No borrow may be held while a handler runs: handlers are free
            // to call `then` on this very future.
            let next = {
                let mut inner = self.inner.borrow_mut();
                let observer = inner.observers.pop_front();
                observer.zip(inner.state.outcome())
            };

            let Some((observer, outcome)) = next else {
                break;
            };

            observer.notify(outcome);
            notified += 1;
        }

        if notified > 0 {
            trace!("future {} notified {notified} observers", self.id());
        }
    }
}
