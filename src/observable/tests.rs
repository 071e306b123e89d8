use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use super::*;
use crate::{observer::Observer, subscribe::Unsubscribeable};

fn collecting_subscriber<T: Send + 'static>() -> (Subscriber<T>, Arc<Mutex<Vec<T>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_c = Arc::clone(&seen);
    (
        Subscriber::on_next(move |v| seen_c.lock().unwrap().push(v)),
        seen,
    )
}

#[test]
fn producer_does_not_run_before_subscribe() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_c = Arc::clone(&runs);

    let _observable: Observable<i32> = Observable::new(move |_| {
        runs_c.fetch_add(1, Ordering::SeqCst);
        UnsubscribeLogic::Nil
    });

    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn every_subscribe_runs_producer_independently() {
    let runs = Arc::new(AtomicUsize::new(0));
    let runs_c = Arc::clone(&runs);
    let mut observable = Observable::new(move |mut emitter| {
        let run = runs_c.fetch_add(1, Ordering::SeqCst);
        emitter.next(run);
        UnsubscribeLogic::Nil
    });

    let (first, first_seen) = collecting_subscriber();
    let (second, second_seen) = collecting_subscriber();
    let first_subscription = observable.subscribe(first);
    first_subscription.unsubscribe();
    let second_subscription = observable.subscribe(second);

    assert_eq!(*first_seen.lock().unwrap(), vec![0]);
    assert_eq!(*second_seen.lock().unwrap(), vec![1]);
    assert!(!second_subscription.is_closed());
}

#[test]
fn emissions_after_unsubscribe_are_dropped() {
    let stash: Arc<Mutex<Option<Emitter<&'static str>>>> = Arc::new(Mutex::new(None));
    let stash_c = Arc::clone(&stash);
    let mut observable = Observable::new(move |mut emitter| {
        emitter.next("first");
        *stash_c.lock().unwrap() = Some(emitter);
        UnsubscribeLogic::Nil
    });

    let (subscriber, seen) = collecting_subscriber();
    let subscription = observable.subscribe(subscriber);
    subscription.unsubscribe();

    let mut emitter = stash.lock().unwrap().take().unwrap();
    emitter.next("late");

    assert_eq!(*seen.lock().unwrap(), vec!["first"]);
}

#[test]
fn producer_teardown_runs_on_unsubscribe() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let torn_down_c = Arc::clone(&torn_down);
    let mut observable = Observable::new(move |_emitter: Emitter<()>| {
        let torn_down = Arc::clone(&torn_down_c);
        UnsubscribeLogic::Logic(Box::new(move || {
            torn_down.fetch_add(1, Ordering::SeqCst);
        }))
    });

    let subscription = observable.subscribe(Subscriber::on_next(|_| {}));
    assert_eq!(torn_down.load(Ordering::SeqCst), 0);

    subscription.unsubscribe();
    subscription.unsubscribe();
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);
}

#[test]
fn teardown_runs_immediately_when_producer_completes_synchronously() {
    let torn_down = Arc::new(AtomicUsize::new(0));
    let torn_down_c = Arc::clone(&torn_down);
    let mut observable = Observable::new(move |mut emitter| {
        emitter.next(1);
        emitter.complete();
        let torn_down = Arc::clone(&torn_down_c);
        UnsubscribeLogic::Logic(Box::new(move || {
            torn_down.fetch_add(1, Ordering::SeqCst);
        }))
    });

    let completed = Arc::new(AtomicUsize::new(0));
    let completed_c = Arc::clone(&completed);
    let mut subscriber = Subscriber::on_next(|_: i32| {});
    subscriber.on_complete(move || {
        completed_c.fetch_add(1, Ordering::SeqCst);
    });

    let subscription = observable.subscribe(subscriber);

    assert!(subscription.is_closed());
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(torn_down.load(Ordering::SeqCst), 1);
}

#[test]
fn listener_may_unsubscribe_from_inside_next() {
    let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let slot_c = Arc::clone(&slot);
    let stash: Arc<Mutex<Option<Emitter<i32>>>> = Arc::new(Mutex::new(None));
    let stash_c = Arc::clone(&stash);

    let mut observable = Observable::new(move |emitter| {
        *stash_c.lock().unwrap() = Some(emitter);
        UnsubscribeLogic::Nil
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_c = Arc::clone(&seen);
    let subscription = observable.subscribe(Subscriber::on_next(move |v| {
        seen_c.lock().unwrap().push(v);
        if let Some(s) = slot_c.lock().unwrap().as_ref() {
            s.unsubscribe();
        }
    }));
    *slot.lock().unwrap() = Some(subscription.clone());

    let mut emitter = stash.lock().unwrap().take().unwrap();
    emitter.next(1);
    emitter.next(2);

    assert!(subscription.is_closed());
    assert_eq!(*seen.lock().unwrap(), vec![1]);
}
