//! Cold observables whose values are pushed from timers, with subscriptions that
//! stop delivery and cancel the timers still pending when they close.
//!
//! An [`Observable`] runs its producer once per [`subscribe`] call. The producer
//! gets an [`Emitter`], the delivery channel of that subscription, and can push
//! values into it synchronously or from timers queued on a [`Scheduler`]. Closing
//! the returned [`Subscription`] is idempotent; after it, no value reaches the
//! listener, and teardowns registered on the emitter (such as timer handles)
//! run exactly once.
//!
//! The [`lifecycle`] module wires these together into the timed names run that
//! the `rxr-lifecycle` binary prints.
//!
//! [`subscribe`]: Subscribeable::subscribe
//! [`Emitter`]: subscribe::Emitter
//! [`Subscription`]: subscribe::Subscription

mod errors;

pub mod config;
pub mod lifecycle;
pub mod observable;
pub mod observer;
pub mod scheduler;
pub mod subscription;

pub use errors::*;
pub use observable::Observable;
pub use observer::Observer;
pub use scheduler::{Lane, Scheduler, TimerHandle};
pub use subscription::subscribe;
pub use subscription::subscribe::{Subscribeable, Unsubscribeable};
