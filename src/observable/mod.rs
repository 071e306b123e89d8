//! The `observable` module provides `Observable`, a cold producer of values that
//! starts running only when something subscribes to it.

use tracing::debug;

use crate::subscription::subscribe::{
    Emitter, Subscribeable, Subscriber, Subscription, UnsubscribeLogic,
};

/// The `Observable` struct represents a source of values that can be observed.
///
/// An `Observable` wraps a producer function. Nothing runs when it is created;
/// every call to `subscribe` opens a fresh delivery channel ([`Emitter`]), runs the
/// producer once with it, and hands back the [`Subscription`] that closes it.
///
/// The producer returns teardown logic that runs when the subscription closes.
/// Resources the producer acquires along the way, like pending timers, can also
/// be registered with [`Emitter::add`].
///
/// # Example: synchronous `Observable`
///
/// ```
/// use rxr_lifecycle::subscribe::{Subscriber, UnsubscribeLogic};
/// use rxr_lifecycle::{Observable, Observer, Subscribeable};
///
/// let mut emit_3_observable = Observable::new(|mut emitter| {
///     for i in 1..=3 {
///         emitter.next(i);
///     }
///     emitter.complete();
///
///     UnsubscribeLogic::Nil
/// });
///
/// let mut observer = Subscriber::on_next(|v| println!("Emitted {}", v));
/// observer.on_complete(|| println!("Completed"));
///
/// // Observables are cold, without this line nothing is emitted.
/// let subscription = emit_3_observable.subscribe(observer);
///
/// // Completion closes the subscription.
/// assert!(subscription.is_closed());
/// ```
///
/// # Example: timed `Observable` with `unsubscribe`
///
/// Values are pushed from timers owned by a [`Scheduler`]. Registering the timer
/// handles with the emitter cancels them once the subscription is closed.
///
/// ```
/// use std::time::Duration;
///
/// use rxr_lifecycle::subscribe::{Subscriber, UnsubscribeLogic, Unsubscribeable};
/// use rxr_lifecycle::{Observable, Observer, Scheduler, Subscribeable};
///
/// let scheduler = Scheduler::new();
/// let timers = scheduler.clone();
///
/// let mut observable = Observable::new(move |mut emitter| {
///     emitter.next(0);
///     for i in 1..=3u64 {
///         let mut e = emitter.clone();
///         let handle = timers.schedule(Duration::from_millis(i * 1000), move || e.next(i));
///         emitter.add(handle);
///     }
///     UnsubscribeLogic::Nil
/// });
///
/// let subscription = observable.subscribe(Subscriber::on_next(|v| println!("Emitted {}", v)));
///
/// scheduler.advance_by(Duration::from_millis(1500));
/// subscription.unsubscribe();
///
/// // Timers for 2000 and 3000 were cancelled along with the subscription.
/// assert_eq!(scheduler.pending(), 0);
/// ```
///
/// [`Scheduler`]: crate::Scheduler
pub struct Observable<T> {
    subscribe_fn: Box<dyn FnMut(Emitter<T>) -> UnsubscribeLogic + Send + Sync>,
}

impl<T> Observable<T> {
    /// Creates a new `Observable` with the provided producer function.
    ///
    /// The producer receives the delivery channel of a single subscription and
    /// returns the teardown logic to run when that subscription closes. It is
    /// invoked once per `subscribe` call.
    pub fn new(sf: impl FnMut(Emitter<T>) -> UnsubscribeLogic + Send + Sync + 'static) -> Self {
        Observable {
            subscribe_fn: Box::new(sf),
        }
    }
}

impl<T: 'static> Subscribeable for Observable<T> {
    type ObsType = T;

    fn subscribe(&mut self, v: Subscriber<Self::ObsType>) -> Subscription {
        let subscription = Subscription::new();
        let emitter = Emitter::new(v, &subscription);

        debug!("observable subscribed");
        let teardown = (self.subscribe_fn)(emitter);

        // Runs right away if the producer already completed or errored.
        subscription.add(teardown);
        subscription
    }
}

#[cfg(test)]
mod tests;
