//! Subscribe/unsubscribe lifecycle of a timed observable.
//!
//! [`names_observable`] pushes its values partly during activation and partly
//! from timers. [`start`] attaches a listener that writes each value to a
//! [`Transcript`] and schedules the external unsubscribe. [`run`] drives the
//! whole thing to completion on the configured clock.
//!
//! With the default configuration the transcript reads:
//!
//! ```text
//! observable executed!
//! Mahathi
//! Chenchu Lakshmi
//! Unsubscribe
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info};

use crate::{
    config::{Clock, Emission, LifecycleConfig},
    observable::Observable,
    observer::Observer,
    scheduler::{Lane, Scheduler},
    subscription::subscribe::{
        Subscribeable, Subscriber, Subscription, UnsubscribeLogic, Unsubscribeable,
    },
};

/// Line written when the producer is activated.
pub const ACTIVATION_MARKER: &str = "observable executed!";
/// Line written right before the external unsubscribe.
pub const UNSUBSCRIBE_MARKER: &str = "Unsubscribe";

/// Sink for the console output of a run.
pub trait Transcript: Send + Sync {
    fn line(&self, line: &str);
}

/// Writes every line to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct Stdout;

impl Transcript for Stdout {
    fn line(&self, line: &str) {
        println!("{line}");
    }
}

/// Keeps every line in memory.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transcript for Recorded {
    fn line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_owned());
    }
}

/// What the producer emits on each activation.
#[derive(Debug, Clone)]
pub struct EmissionPlan {
    pub emissions: Vec<Emission>,
    /// Register every timer with the subscription so closing it cancels them.
    pub cancel_pending: bool,
}

impl From<&LifecycleConfig> for EmissionPlan {
    fn from(config: &LifecycleConfig) -> Self {
        EmissionPlan {
            emissions: config.emissions.clone(),
            cancel_pending: config.cancel_pending,
        }
    }
}

/// Builds the observable that, on each subscribe, writes [`ACTIVATION_MARKER`],
/// pushes the immediate emissions and schedules the delayed ones on `scheduler`.
pub fn names_observable(
    scheduler: &Scheduler,
    plan: EmissionPlan,
    transcript: Arc<dyn Transcript>,
) -> Observable<String> {
    let scheduler = scheduler.clone();

    Observable::new(move |mut emitter| {
        transcript.line(ACTIVATION_MARKER);

        for emission in &plan.emissions {
            let Some(delay) = emission.delay() else {
                emitter.next(emission.value.clone());
                continue;
            };
            let mut e = emitter.clone();
            let value = emission.value.clone();
            let handle = scheduler.schedule(delay, move || e.next(value));
            if plan.cancel_pending {
                emitter.add(handle);
            }
        }

        UnsubscribeLogic::Nil
    })
}

/// Subscribes a transcript-writing listener to `observable` and schedules the
/// external unsubscribe `config.unsubscribe_after()` from now on the control lane.
///
/// The returned subscription is the one the timer closes.
pub fn start(
    config: &LifecycleConfig,
    scheduler: &Scheduler,
    observable: &mut Observable<String>,
    transcript: Arc<dyn Transcript>,
) -> Subscription {
    let listener = {
        let transcript = Arc::clone(&transcript);
        Subscriber::on_next(move |value: String| transcript.line(&value))
    };
    let subscription = observable.subscribe(listener);

    let target = subscription.clone();
    scheduler.schedule_on(Lane::Control, config.unsubscribe_after(), move || {
        transcript.line(UNSUBSCRIBE_MARKER);
        target.unsubscribe();
    });
    debug!(after = ?config.unsubscribe_after(), "unsubscribe scheduled");

    subscription
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub subscription: Subscription,
    /// Timers that fired, the unsubscribe timer included.
    pub timers_fired: usize,
}

/// Runs one full lifecycle with a fresh scheduler and returns once no timers
/// are left.
pub async fn run(config: &LifecycleConfig, transcript: Arc<dyn Transcript>) -> RunReport {
    let scheduler = Scheduler::new();
    let mut observable =
        names_observable(&scheduler, EmissionPlan::from(config), Arc::clone(&transcript));
    let subscription = start(config, &scheduler, &mut observable, transcript);

    let timers_fired = match config.clock {
        Clock::Realtime => scheduler.run_realtime().await,
        Clock::Virtual => scheduler.run_until_idle(),
    };
    info!(
        timers_fired,
        closed = subscription.is_closed(),
        "lifecycle finished"
    );

    RunReport {
        subscription,
        timers_fired,
    }
}
