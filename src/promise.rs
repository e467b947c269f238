//! The cancellable promise: settlement lifecycle, chaining and abort.
//!
//! A [`Promise`] wraps a single-settlement cell together with an abort cell
//! and a scheduler handle. Chaining (`then`/`catch`/`then_catch`/`branch`)
//! produces a new promise whose abort cell is parent-linked to the
//! receiver's, so [`abort()`](Promise::abort) on any descendant cascades to
//! the chain root. Abort is cooperative: it never interrupts a running
//! callback, it only changes how settlement is observed from that moment on.
//!
//! `Promise` is a cheap shared handle; cloning it clones the handle, not the
//! computation.

use crate::abort::AbortCell;
use crate::cell::{Cell, Outcome, Waiter};
use crate::error::{CancelError, Rejection};
use crate::scheduler::Scheduler;
use std::sync::Arc;

/// What a continuation hands back to the chain: either a plain value, or
/// another in-flight promise whose settlement the chain adopts (flattening).
pub enum Chained<T> {
    /// A plain value; the derived promise fulfils with it directly.
    Immediate(T),
    /// A promise; the derived promise settles however this one settles.
    Deferred(Promise<T>),
}

impl<T> From<Promise<T>> for Chained<T> {
    fn from(promise: Promise<T>) -> Self {
        Self::Deferred(promise)
    }
}

/// The result of a resolver or continuation body. `Err` rejects the derived
/// promise with the given rejection, the Rust rendering of a thrown error.
pub type ChainResult<T> = Result<Chained<T>, Rejection>;

pub(crate) struct Shared<T> {
    pub(crate) scheduler: Scheduler,
    pub(crate) abort: Arc<AbortCell>,
    pub(crate) cell: Cell<T>,
}

/// A cancellation-aware, single-settlement asynchronous value.
///
/// Settles exactly once, from `Pending` to fulfilled or rejected. Orthogonally,
/// the abort flag may flip (once, stickily) at any time; if it flips before
/// the first settlement attempt, the promise settles as
/// [`Rejection::Cancelled`] no matter what was resolved or rejected.
pub struct Promise<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Constructs a promise and hands the resolver a [`Settler`] for it.
    ///
    /// The resolver is invoked subject to the scheduler toggle: inline in
    /// synchronous mode, on a later task-queue turn in deferred mode. An
    /// `Err` returned from the resolver body is routed to `reject`. The
    /// settler may be stashed and used long after the resolver returns.
    ///
    /// # Example
    ///
    /// ```
    /// use promise_chain::{Promise, Scheduler};
    ///
    /// let scheduler = Scheduler::new();
    /// let p = Promise::new(&scheduler, |settler| {
    ///     settler.resolve(42);
    ///     Ok(())
    /// });
    /// assert!(matches!(p.try_result(), Some(Ok(42))));
    /// ```
    pub fn new<F>(scheduler: &Scheduler, resolver: F) -> Self
    where
        F: FnOnce(Settler<T>) -> Result<(), Rejection> + Send + 'static,
    {
        let promise = Self::unsettled(scheduler.clone(), None);
        let settler = Settler {
            promise: promise.clone(),
        };
        scheduler.run(move || {
            let on_err = settler.clone();
            if let Err(rejection) = resolver(settler) {
                on_err.reject(rejection);
            }
        });
        promise
    }

    /// An immediately-fulfilling promise.
    pub fn resolve(scheduler: &Scheduler, value: T) -> Self {
        Self::new(scheduler, move |settler| {
            settler.resolve(value);
            Ok(())
        })
    }

    /// An immediately-rejecting promise.
    pub fn reject(scheduler: &Scheduler, rejection: Rejection) -> Self {
        Self::new(scheduler, move |settler| {
            settler.reject(rejection);
            Ok(())
        })
    }

    /// A promise from either a plain value or another promise, flattening
    /// the latter into a new parent-linked chain node.
    pub fn from_chained(scheduler: &Scheduler, chained: Chained<T>) -> Self {
        match chained {
            Chained::Immediate(value) => Self::resolve(scheduler, value),
            Chained::Deferred(promise) => promise.branch(),
        }
    }

    /// Chains a fulfilment handler; rejections pass through untouched.
    ///
    /// The returned promise is parent-linked to the receiver. The handler's
    /// [`ChainResult`] settles it: an immediate value fulfils, a deferred
    /// promise is flattened, an `Err` rejects.
    ///
    /// # Example
    ///
    /// ```
    /// use promise_chain::{Chained, Promise, Scheduler};
    ///
    /// let scheduler = Scheduler::new();
    /// let doubled = Promise::resolve(&scheduler, 21).then(|n| Ok(Chained::Immediate(n * 2)));
    /// assert!(matches!(doubled.try_result(), Some(Ok(42))));
    /// ```
    pub fn then<U, F>(&self, on_fulfilled: F) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> ChainResult<U> + Send + 'static,
    {
        self.derive(on_fulfilled, Err)
    }

    /// Chains a rejection handler; fulfilment passes through untouched.
    ///
    /// The handler may recover (fulfilling the derived promise), re-reject,
    /// or substitute another promise. It also sees cancellation rejections,
    /// which is the hook for cleanup after an abort. Once the
    /// receiver is aborted the derived promise's rejection is fixed and the
    /// handler's return value is ignored.
    pub fn catch<F>(&self, on_rejected: F) -> Promise<T>
    where
        F: FnOnce(Rejection) -> ChainResult<T> + Send + 'static,
    {
        self.derive(|value| Ok(Chained::Immediate(value)), on_rejected)
    }

    /// Chains both handlers at once, like `then(on_fulfilled, on_rejected)`
    /// in promise libraries with optional second arguments.
    pub fn then_catch<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> ChainResult<U> + Send + 'static,
        R: FnOnce(Rejection) -> ChainResult<U> + Send + 'static,
    {
        self.derive(on_fulfilled, on_rejected)
    }

    /// The no-handler `then()`: a new parent-linked chain node that mirrors
    /// the receiver's settlement. Aborting the branch cascades into the
    /// receiver; aborting the receiver cancels the branch's settlement.
    pub fn branch(&self) -> Promise<T> {
        self.derive(|value| Ok(Chained::Immediate(value)), Err)
    }

    /// Registers a cleanup observer invoked once the receiver settles,
    /// regardless of outcome. The settlement value is not altered and the
    /// receiver itself is returned, so further chaining continues from the
    /// original settlement.
    pub fn finally<F>(&self, on_finally: F) -> Promise<T>
    where
        F: FnOnce() + Send + 'static,
    {
        self.subscribe_outcome(Box::new(move |_| on_finally()));
        self.clone()
    }

    /// Aborts this promise and, transitively, every ancestor in its chain.
    ///
    /// Idempotent: the first call installs a fresh [`CancelError`] as the
    /// shared cause; later calls are no-ops. Abort does not force settlement
    /// of anything still pending; it only guarantees that settlement, when
    /// attempted, is observed as [`Rejection::Cancelled`].
    pub fn abort(&self) {
        self.shared.abort.abort(Arc::new(CancelError::new()));
    }

    /// Like [`abort()`](Promise::abort), with a caller-supplied message on
    /// the cancellation cause.
    pub fn abort_with_message(&self, message: impl Into<String>) {
        self.shared
            .abort
            .abort(Arc::new(CancelError::with_message(message)));
    }

    /// True if this promise has been aborted, directly or by a descendant.
    pub fn is_aborted(&self) -> bool {
        self.shared.abort.is_aborted()
    }

    /// A clone of the settlement, or `None` while pending. The synchronous
    /// counterpart of [`wait()`](Promise::wait).
    pub fn try_result(&self) -> Option<Result<T, Rejection>> {
        self.shared.cell.peek()
    }

    /// Awaits settlement.
    ///
    /// Works in either scheduler mode; in synchronous mode the promise has
    /// usually settled before the first poll.
    pub async fn wait(&self) -> Result<T, Rejection> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.subscribe_outcome(Box::new(move |outcome| {
            let _ = tx.send(outcome);
        }));
        match rx.await {
            Ok(outcome) => outcome,
            // The cell outlives this borrow, so the sender can only vanish
            // if settlement was abandoned wholesale. That is not a caller
            // abort, so it must not read as cancelled.
            Err(_) => Err(Rejection::propagated("settlement abandoned")),
        }
    }

    /// A pending promise, optionally parent-linked for abort cascade (I4:
    /// the link is in place before the promise is ever visible to callers).
    pub(crate) fn unsettled(scheduler: Scheduler, parent: Option<&Arc<AbortCell>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                scheduler,
                abort: Arc::new(AbortCell::new(parent)),
                cell: Cell::new(),
            }),
        }
    }

    /// Attempts settlement, converting it to the cancellation cause if the
    /// abort flag is already up. No-op once settled.
    pub(crate) fn settle(&self, outcome: Outcome<T>) {
        let outcome = match self.shared.abort.cause() {
            Some(cause) => {
                tracing::trace!("settling aborted promise as cancelled");
                Err(Rejection::Cancelled(cause))
            }
            None => outcome,
        };
        self.shared.cell.settle(&self.shared.scheduler, outcome);
    }

    pub(crate) fn subscribe_outcome(&self, waiter: Waiter<T>) {
        self.shared.cell.subscribe(&self.shared.scheduler, waiter);
    }

    /// Settles from a continuation's [`ChainResult`], flattening a deferred
    /// promise by adopting its settlement.
    pub(crate) fn settle_chained(&self, step: ChainResult<T>) {
        match step {
            Ok(Chained::Immediate(value)) => self.settle(Ok(value)),
            Ok(Chained::Deferred(inner)) => {
                let target = self.clone();
                inner.subscribe_outcome(Box::new(move |outcome| target.settle(outcome)));
            }
            Err(rejection) => self.settle(Err(rejection)),
        }
    }

    /// The shared chaining engine behind `then`/`catch`/`then_catch`/
    /// `branch`. When the receiver settles, exactly one handler runs and its
    /// result settles the derived promise unless the receiver has been
    /// aborted by then, in which case the rejection handler is informed of
    /// the cancellation for cleanup, its result is discarded, and the
    /// derived promise rejects with the receiver's cause.
    fn derive<U, F, R>(&self, on_fulfilled: F, on_rejected: R) -> Promise<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> ChainResult<U> + Send + 'static,
        R: FnOnce(Rejection) -> ChainResult<U> + Send + 'static,
    {
        let derived = Promise::unsettled(self.shared.scheduler.clone(), Some(&self.shared.abort));
        let receiver_abort = self.shared.abort.clone();
        let target = derived.clone();

        self.subscribe_outcome(Box::new(move |outcome| {
            if let Some(cause) = receiver_abort.cause() {
                let rejection = Rejection::Cancelled(cause);
                let _ = on_rejected(rejection.clone());
                target.settle(Err(rejection));
                return;
            }
            let step = match outcome {
                Ok(value) => on_fulfilled(value),
                Err(rejection) => on_rejected(rejection),
            };
            target.settle_chained(step);
        }));

        derived
    }
}

/// The resolver's handle onto its promise.
///
/// Cloneable; may be stashed and used after the resolver body returns. The
/// first settlement wins and later calls are ignored. If the promise has been
/// aborted, both `resolve` and `reject` settle it as
/// [`Rejection::Cancelled`] instead (the abort cause always wins).
pub struct Settler<T> {
    promise: Promise<T>,
}

impl<T> Clone for Settler<T> {
    fn clone(&self) -> Self {
        Self {
            promise: self.promise.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Settler<T> {
    /// Fulfils the promise with a value.
    pub fn resolve(&self, value: T) {
        self.promise.settle(Ok(value));
    }

    /// Rejects the promise.
    pub fn reject(&self, rejection: Rejection) {
        self.promise.settle(Err(rejection));
    }

    /// Adopts another promise's settlement (resolver-side flattening).
    pub fn chain(&self, other: &Promise<T>) {
        let promise = self.promise.clone();
        other.subscribe_outcome(Box::new(move |outcome| promise.settle(outcome)));
    }
}
