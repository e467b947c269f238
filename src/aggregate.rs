//! Aggregate combinators over collections of promises.
//!
//! Both combinators accept [`Chained`] items, so plain values and in-flight
//! promises can be mixed freely, and both filter their outcome through the
//! aggregate promise's **own** abort flag.
//!
//! Known limitation, kept deliberately: the abort flags of the individual
//! elements are never consulted. Aborting one element does not remove it
//! from the aggregate and does not cascade into its siblings; only aborting
//! the aggregate promise itself cancels the aggregate outcome.

use crate::cell::Outcome;
use crate::promise::{Chained, Promise};
use crate::scheduler::Scheduler;
use std::sync::Arc;

struct Gather<T> {
    slots: Vec<Option<T>>,
    remaining: usize,
    done: bool,
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Fulfils with every element's value, in input order, once all
    /// elements fulfil; rejects with the first rejection observed.
    ///
    /// Aggregate assembly is subject to the scheduler toggle, like any
    /// other callback. An empty input fulfils with an empty `Vec`.
    ///
    /// # Example
    ///
    /// ```
    /// use promise_chain::{Chained, Promise, Scheduler};
    ///
    /// let scheduler = Scheduler::new();
    /// let all = Promise::all(
    ///     &scheduler,
    ///     [
    ///         Chained::Deferred(Promise::resolve(&scheduler, 1)),
    ///         Chained::Immediate(2),
    ///         Chained::Deferred(Promise::resolve(&scheduler, 3)),
    ///     ],
    /// );
    /// assert_eq!(all.try_result().unwrap().unwrap(), vec![1, 2, 3]);
    /// ```
    pub fn all(
        scheduler: &Scheduler,
        items: impl IntoIterator<Item = Chained<T>>,
    ) -> Promise<Vec<T>> {
        let aggregate = Promise::unsettled(scheduler.clone(), None);
        let items: Vec<Chained<T>> = items.into_iter().collect();

        let agg = aggregate.clone();
        scheduler.run(move || {
            let total = items.len();
            if total == 0 {
                agg.settle(Ok(Vec::new()));
                return;
            }
            let gather = Arc::new(spin::Mutex::new(Gather {
                slots: vec![None; total],
                remaining: total,
                done: false,
            }));
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Chained::Immediate(value) => Self::gather(&gather, &agg, index, Ok(value)),
                    Chained::Deferred(promise) => {
                        let gather = gather.clone();
                        let agg = agg.clone();
                        promise.subscribe_outcome(Box::new(move |outcome| {
                            Self::gather(&gather, &agg, index, outcome);
                        }));
                    }
                }
            }
        });

        aggregate
    }

    /// Settles with whichever element settles first, value or rejection.
    ///
    /// Later settlements are ignored by the single-settlement rule. An
    /// empty input never settles.
    ///
    /// # Example
    ///
    /// ```
    /// use promise_chain::{Chained, Promise, Scheduler};
    ///
    /// let scheduler = Scheduler::new();
    /// let never = Promise::<&str>::new(&scheduler, |_settler| Ok(()));
    /// let race = Promise::race(
    ///     &scheduler,
    ///     [Chained::Deferred(never), Chained::Immediate("fast")],
    /// );
    /// assert!(matches!(race.try_result(), Some(Ok("fast"))));
    /// ```
    pub fn race(scheduler: &Scheduler, items: impl IntoIterator<Item = Chained<T>>) -> Promise<T> {
        let aggregate = Promise::unsettled(scheduler.clone(), None);
        let items: Vec<Chained<T>> = items.into_iter().collect();

        let agg = aggregate.clone();
        scheduler.run(move || {
            for item in items {
                match item {
                    Chained::Immediate(value) => agg.settle(Ok(value)),
                    Chained::Deferred(promise) => {
                        let agg = agg.clone();
                        promise.subscribe_outcome(Box::new(move |outcome| agg.settle(outcome)));
                    }
                }
            }
        });

        aggregate
    }

    /// Records one element outcome for `all`, settling the aggregate on
    /// completion or on the first rejection. The lock is released before
    /// settlement so no callback runs under it.
    fn gather(
        gather: &Arc<spin::Mutex<Gather<T>>>,
        aggregate: &Promise<Vec<T>>,
        index: usize,
        outcome: Outcome<T>,
    ) {
        let finished = {
            let mut gather = gather.lock();
            if gather.done {
                return;
            }
            match outcome {
                Ok(value) => {
                    gather.slots[index] = Some(value);
                    gather.remaining -= 1;
                    if gather.remaining > 0 {
                        return;
                    }
                    gather.done = true;
                    Ok(core::mem::take(&mut gather.slots))
                }
                Err(rejection) => {
                    gather.done = true;
                    Err(rejection)
                }
            }
        };
        match finished {
            Ok(slots) => aggregate.settle(Ok(slots.into_iter().flatten().collect())),
            Err(rejection) => aggregate.settle(Err(rejection)),
        }
    }
}
