use std::{
    error::Error,
    fmt,
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use tokio::runtime;
use tracing::{debug, trace, warn};

use crate::{errors::ObservableError, observer::Observer, scheduler::TimerHandle};

/// A trait for types that can be subscribed to, allowing consumers to receive
/// values emitted by an observable stream.
pub trait Subscribeable {
    /// The type of items emitted by the observable stream.
    type ObsType;

    /// Attaches `s` to the source and starts its emissions.
    ///
    /// Every call is an independent activation with its own delivery channel. The
    /// returned `Subscription` closes that channel.
    fn subscribe(&mut self, s: Subscriber<Self::ObsType>) -> Subscription;
}

/// A trait for types that can be unsubscribed, allowing the clean release of resources
/// associated with a subscription.
pub trait Unsubscribeable {
    /// Stops delivery and releases whatever the producer registered for cleanup,
    /// such as pending timers.
    ///
    /// Calling it more than once has the same effect as calling it once.
    fn unsubscribe(&self);
}

type NextFn<T> = Box<dyn FnMut(T) + Send>;
type CompleteFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(Arc<dyn Error + Send + Sync>) + Send>;

/// A type that acts as an observer, allowing users to handle emitted values, errors,
/// and completion when subscribing to an `Observable`.
///
/// Only the `next` handler is mandatory. Missing `error` and `complete` handlers
/// are treated as no-ops.
pub struct Subscriber<NextFnType> {
    next_fn: NextFn<NextFnType>,
    complete_fn: Option<CompleteFn>,
    error_fn: Option<ErrorFn>,
}

impl<NextFnType> Subscriber<NextFnType> {
    /// Creates a new `Subscriber` instance with custom handling functions for emitted
    /// values, errors, and completion.
    pub fn new(
        next_fn: impl FnMut(NextFnType) + 'static + Send,
        error_fn: impl FnMut(Arc<dyn Error + Send + Sync>) + 'static + Send,
        complete_fn: impl FnMut() + 'static + Send,
    ) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: Some(Box::new(complete_fn)),
            error_fn: Some(Box::new(error_fn)),
        }
    }

    /// Create a new Subscriber with the provided `next` function.
    ///
    /// The `next` closure is called when the observable emits a new item. It takes
    /// a parameter of type `NextFnType`, which is an item emitted by the observable.
    pub fn on_next(next_fn: impl FnMut(NextFnType) + 'static + Send) -> Self {
        Subscriber {
            next_fn: Box::new(next_fn),
            complete_fn: None,
            error_fn: None,
        }
    }

    /// Set the completion function for the Subscriber.
    pub fn on_complete(&mut self, complete_fn: impl FnMut() + 'static + Send) {
        self.complete_fn = Some(Box::new(complete_fn));
    }

    /// Set the error-handling function for the Subscriber.
    pub fn on_error(
        &mut self,
        error_fn: impl FnMut(Arc<dyn Error + Send + Sync>) + 'static + Send,
    ) {
        self.error_fn = Some(Box::new(error_fn));
    }
}

impl<T> Observer for Subscriber<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        (self.next_fn)(v);
    }

    fn complete(&mut self) {
        if let Some(cfn) = &mut self.complete_fn {
            (cfn)();
        }
    }

    fn error(&mut self, observable_error: Arc<dyn Error + Send + Sync>) {
        if let Some(efn) = &mut self.error_fn {
            (efn)(observable_error);
        }
    }
}

/// Enumerates various unsubscribe logic options for a subscription.
pub enum UnsubscribeLogic {
    /// No specific unsubscribe logic.
    Nil,

    /// If one subscription depends on another. Wrapped subscription's unsubscribe
    /// will be called upon unsubscribing.
    Wrapped(Box<Subscription>),

    /// Unsubscribe logic defined by a function.
    Logic(Box<dyn FnOnce() + Send>),

    /// Pending timer to cancel. Dropped from the subscription once it has fired.
    Timer(TimerHandle),

    /// Asynchronous unsubscribe logic represented by a future. It is spawned on the
    /// `Tokio` runtime that was current when the subscription was created.
    Future(Pin<Box<dyn Future<Output = ()> + Send>>),
}

impl UnsubscribeLogic {
    /// `true` for teardowns that no longer have anything to release.
    fn is_spent(&self) -> bool {
        match self {
            UnsubscribeLogic::Nil => true,
            UnsubscribeLogic::Timer(handle) => !handle.is_pending(),
            _ => false,
        }
    }

    fn run(self, runtime_handle: Option<&runtime::Handle>) {
        match self {
            UnsubscribeLogic::Nil => (),
            UnsubscribeLogic::Logic(fnc) => fnc(),
            UnsubscribeLogic::Timer(handle) => {
                handle.cancel();
            }
            UnsubscribeLogic::Wrapped(subscription) => subscription.unsubscribe(),
            UnsubscribeLogic::Future(future) => match runtime_handle {
                Some(handle) => {
                    handle.spawn(future);
                }
                None => {
                    warn!("asynchronous unsubscribe logic dropped: no Tokio runtime");
                }
            },
        }
    }
}

impl fmt::Debug for UnsubscribeLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            UnsubscribeLogic::Nil => "Nil",
            UnsubscribeLogic::Wrapped(_) => "Wrapped",
            UnsubscribeLogic::Logic(_) => "Logic",
            UnsubscribeLogic::Timer(_) => "Timer",
            UnsubscribeLogic::Future(_) => "Future",
        };
        f.write_str(kind)
    }
}

/// Open/closed flag plus the teardowns to run on close, shared by a `Subscription`
/// and the `Emitter` it controls.
struct SubscriptionState {
    closed: AtomicBool,
    teardowns: Mutex<Vec<UnsubscribeLogic>>,
    runtime_handle: Option<runtime::Handle>,
}

impl SubscriptionState {
    fn new() -> Self {
        SubscriptionState {
            closed: AtomicBool::new(false),
            teardowns: Mutex::new(Vec::new()),
            runtime_handle: runtime::Handle::try_current().ok(),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn teardowns(&self) -> MutexGuard<'_, Vec<UnsubscribeLogic>> {
        self.teardowns.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flips the state to closed. Returns the registered teardowns to the caller
    /// that performed the transition, `None` to everyone else.
    fn close(&self) -> Option<Vec<UnsubscribeLogic>> {
        let mut teardowns = self.teardowns();
        if self.closed.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(std::mem::take(&mut *teardowns))
    }

    fn run_teardowns(&self, teardowns: Vec<UnsubscribeLogic>) {
        for teardown in teardowns {
            teardown.run(self.runtime_handle.as_ref());
        }
    }

    fn add(&self, teardown: UnsubscribeLogic) {
        if teardown.is_spent() {
            return;
        }
        let mut teardowns = self.teardowns();
        if self.is_closed() {
            drop(teardowns);
            teardown.run(self.runtime_handle.as_ref());
            return;
        }
        // Fired timers would otherwise pile up for the life of the subscription.
        teardowns.retain(|t| !t.is_spent());
        teardowns.push(teardown);
    }
}

/// The delivery channel a producer pushes values into.
///
/// Wraps the user's `Subscriber` and enforces the subscription contract: nothing
/// reaches the listener once the channel is closed, whether by `unsubscribe`,
/// `complete` or `error`. The closed flag is read at the moment of each push.
///
/// Cloning is shallow, so delayed callbacks can each hold their own handle.
pub struct Emitter<T> {
    subscriber: Arc<Mutex<Subscriber<T>>>,
    state: Arc<SubscriptionState>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Emitter {
            subscriber: Arc::clone(&self.subscriber),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Emitter<T> {
    pub(crate) fn new(subscriber: Subscriber<T>, subscription: &Subscription) -> Self {
        Emitter {
            subscriber: Arc::new(Mutex::new(subscriber)),
            state: Arc::clone(&subscription.state),
        }
    }

    /// Returns `true` once the channel stopped delivering.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Registers logic to run when the channel closes, typically a pending timer
    /// that should be cancelled. Runs it right away if the channel is already closed.
    pub fn add(&self, teardown: impl Into<UnsubscribeLogic>) {
        self.state.add(teardown.into());
    }

    fn subscriber(&self) -> MutexGuard<'_, Subscriber<T>> {
        self.subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Observer for Emitter<T> {
    type NextFnType = T;

    fn next(&mut self, v: Self::NextFnType) {
        // Checked under the subscriber lock so a push queued behind a running
        // delivery cannot slip in after `unsubscribe` returned.
        let mut subscriber = self.subscriber();
        if self.state.is_closed() {
            trace!("push dropped: subscription closed");
            return;
        }
        subscriber.next(v);
    }

    fn complete(&mut self) {
        let mut subscriber = self.subscriber();
        let Some(teardowns) = self.state.close() else {
            return;
        };
        debug!("observable completed");
        subscriber.complete();
        drop(subscriber);
        self.state.run_teardowns(teardowns);
    }

    fn error(&mut self, observable_error: Arc<dyn Error + Send + Sync>) {
        let mut subscriber = self.subscriber();
        let Some(teardowns) = self.state.close() else {
            return;
        };
        debug!(
            error = %observable_error,
            label = error_label(&observable_error),
            "observable errored"
        );
        subscriber.error(observable_error);
        drop(subscriber);
        self.state.run_teardowns(teardowns);
    }
}

fn error_label(err: &Arc<dyn Error + Send + Sync>) -> &'static str {
    err.downcast_ref::<ObservableError>()
        .map_or("external", ObservableError::as_label)
}

/// Represents a subscription to an observable, allowing control over the
/// delivery channel created when the observable was subscribed to.
///
/// Cloning is shallow: every clone controls the same channel.
#[derive(Clone)]
pub struct Subscription {
    state: Arc<SubscriptionState>,
}

impl Subscription {
    /// Creates an open subscription with no teardown logic.
    #[must_use]
    pub fn new() -> Self {
        Subscription {
            state: Arc::new(SubscriptionState::new()),
        }
    }

    /// Returns `true` once the subscription was unsubscribed, or the observable
    /// completed or errored.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Registers additional teardown logic. See [`Emitter::add`].
    pub fn add(&self, teardown: impl Into<UnsubscribeLogic>) {
        self.state.add(teardown.into());
    }
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Unsubscribeable for Subscription {
    fn unsubscribe(&self) {
        match self.state.close() {
            Some(teardowns) => {
                debug!(teardowns = teardowns.len(), "unsubscribed");
                self.state.run_teardowns(teardowns);
            }
            None => trace!("unsubscribe ignored: already closed"),
        }
    }
}

impl From<Subscription> for UnsubscribeLogic {
    fn from(subscription: Subscription) -> Self {
        UnsubscribeLogic::Wrapped(Box::new(subscription))
    }
}
