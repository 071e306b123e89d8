//! Provides structures and traits related to subscription management.
//!
//! This module includes `Subscriber` for handling observed values, errors and
//! completions, `Emitter` for the producer side of a subscription, and
//! `Subscription` for closing it.
//!
//! Additionally, it defines the teardown variants that run when a subscription
//! closes.
pub mod subscribe;
