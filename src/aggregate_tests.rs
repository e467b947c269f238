use crate::error::Rejection;
use crate::promise::{Chained, Promise, Settler};
use crate::scheduler::Scheduler;
use std::sync::Arc;

fn stashed<T: Clone + Send + 'static>(scheduler: &Scheduler) -> (Promise<T>, Settler<T>) {
    let slot = Arc::new(spin::Mutex::new(None));
    let stash = slot.clone();
    let promise = Promise::new(scheduler, move |settler| {
        *stash.lock() = Some(settler);
        Ok(())
    });
    let settler = slot.lock().take().expect("synchronous resolver");
    (promise, settler)
}

#[test]
fn all_preserves_input_order() {
    let scheduler = Scheduler::new();
    let all = Promise::all(
        &scheduler,
        [1, 2, 3].map(|n| Chained::Deferred(Promise::resolve(&scheduler, n))),
    );
    assert_eq!(all.try_result().unwrap().unwrap(), vec![1, 2, 3]);
}

#[test]
fn all_preserves_input_order_against_completion_order() {
    let scheduler = Scheduler::new();
    let (first, settle_first) = stashed::<u32>(&scheduler);
    let (second, settle_second) = stashed::<u32>(&scheduler);

    let all = Promise::all(
        &scheduler,
        [Chained::Deferred(first), Chained::Deferred(second)],
    );

    // Settle in reverse order; the result order must follow the input.
    settle_second.resolve(2);
    assert!(all.try_result().is_none());
    settle_first.resolve(1);

    assert_eq!(all.try_result().unwrap().unwrap(), vec![1, 2]);
}

#[test]
fn all_accepts_mixed_values_and_promises() {
    let scheduler = Scheduler::new();
    let all = Promise::all(
        &scheduler,
        [
            Chained::Deferred(Promise::resolve(&scheduler, 1)),
            Chained::Immediate(2),
        ],
    );
    assert_eq!(all.try_result().unwrap().unwrap(), vec![1, 2]);
}

#[test]
fn all_rejects_with_the_first_rejection() {
    let scheduler = Scheduler::new();
    let all = Promise::all(
        &scheduler,
        [
            Chained::Deferred(Promise::resolve(&scheduler, 1)),
            Chained::Deferred(Promise::reject(&scheduler, Rejection::propagated("boom"))),
        ],
    );

    match all.try_result() {
        Some(Err(Rejection::Propagated(e))) => assert_eq!(e.to_string(), "boom"),
        other => panic!("expected propagated rejection, got {other:?}"),
    }
}

#[test]
fn all_of_nothing_fulfils_with_nothing() {
    let scheduler = Scheduler::new();
    let all = Promise::<u32>::all(&scheduler, []);
    assert_eq!(all.try_result().unwrap().unwrap(), Vec::<u32>::new());
}

#[test]
fn race_settles_with_the_first_settler() {
    let scheduler = Scheduler::new();
    let (never, _keep_pending) = stashed::<&str>(&scheduler);

    let race = Promise::race(
        &scheduler,
        [
            Chained::Deferred(never),
            Chained::Deferred(Promise::resolve(&scheduler, "fast")),
        ],
    );

    assert!(matches!(race.try_result(), Some(Ok("fast"))));
}

#[test]
fn race_propagates_the_first_rejection() {
    let scheduler = Scheduler::new();
    let (never, _keep_pending) = stashed::<u32>(&scheduler);

    let race = Promise::race(
        &scheduler,
        [
            Chained::Deferred(never),
            Chained::Deferred(Promise::reject(&scheduler, Rejection::propagated("boom"))),
        ],
    );

    match race.try_result() {
        Some(Err(Rejection::Propagated(e))) => assert_eq!(e.to_string(), "boom"),
        other => panic!("expected propagated rejection, got {other:?}"),
    }
}

#[test]
fn aborting_the_aggregate_overrides_its_outcome() {
    let scheduler = Scheduler::new();
    let (element, settler) = stashed::<u32>(&scheduler);

    let all = Promise::all(&scheduler, [Chained::Deferred(element)]);
    all.abort();
    settler.resolve(1);

    assert!(matches!(
        all.try_result(),
        Some(Err(Rejection::Cancelled(_)))
    ));
}

#[test]
fn aborting_the_aggregate_leaves_elements_alone() {
    let scheduler = Scheduler::new();
    let (element, _settler) = stashed::<u32>(&scheduler);

    let all = Promise::all(&scheduler, [Chained::Deferred(element.clone())]);
    all.abort();

    // The aggregate checks only its own flag; the element is untouched.
    assert!(all.is_aborted());
    assert!(!element.is_aborted());
}

#[test]
fn aborting_an_element_does_not_cascade_to_siblings() {
    let scheduler = Scheduler::new();
    let (left, settle_left) = stashed::<u32>(&scheduler);
    let (right, settle_right) = stashed::<u32>(&scheduler);

    let all = Promise::all(
        &scheduler,
        [Chained::Deferred(left.clone()), Chained::Deferred(right.clone())],
    );

    left.abort();
    assert!(!right.is_aborted());
    assert!(!all.is_aborted());

    // The aborted element settles cancelled, which the aggregate reports
    // as an ordinary first rejection.
    settle_left.resolve(1);
    settle_right.resolve(2);
    assert!(matches!(
        all.try_result(),
        Some(Err(Rejection::Cancelled(_)))
    ));
}

#[tokio::test]
async fn deferred_mode_aggregates_settle_through_the_queue() {
    let scheduler = Scheduler::new();
    scheduler.set_async(true);

    let all = Promise::all(
        &scheduler,
        [1, 2, 3].map(|n| Chained::Deferred(Promise::resolve(&scheduler, n))),
    );

    assert_eq!(all.wait().await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn deferred_race_against_a_timer() {
    let scheduler = Scheduler::new();
    scheduler.set_async(true);

    let slow = Promise::new(&scheduler, |settler| {
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
            settler.resolve("slow");
        });
        Ok(())
    });
    let fast = Promise::resolve(&scheduler, "fast");

    let race = Promise::race(&scheduler, [Chained::Deferred(slow), Chained::Deferred(fast)]);
    assert!(matches!(race.wait().await, Ok("fast")));
}
