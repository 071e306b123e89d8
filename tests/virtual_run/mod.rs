use std::sync::Arc;

use rxr_lifecycle::{
    config::{Clock, Emission, LifecycleConfig},
    lifecycle::{self, EmissionPlan, Recorded},
    subscribe::Subscription,
    Scheduler,
};

pub fn config(unsubscribe_after_ms: u64, emissions: Vec<Emission>) -> LifecycleConfig {
    LifecycleConfig {
        unsubscribe_after_ms,
        emissions,
        cancel_pending: true,
        clock: Clock::Virtual,
    }
}

/// Subscribes per `config` on a fresh virtual scheduler without driving it.
pub fn started(config: &LifecycleConfig) -> (Scheduler, Subscription, Recorded) {
    let scheduler = Scheduler::new();
    let transcript = Recorded::new();
    let mut observable = lifecycle::names_observable(
        &scheduler,
        EmissionPlan::from(config),
        Arc::new(transcript.clone()),
    );
    let subscription =
        lifecycle::start(config, &scheduler, &mut observable, Arc::new(transcript.clone()));
    (scheduler, subscription, transcript)
}

/// Runs `config` to completion on a virtual clock and returns the transcript.
pub fn transcript(config: &LifecycleConfig) -> Vec<String> {
    let (scheduler, _subscription, transcript) = started(config);
    scheduler.run_until_idle();
    transcript.lines()
}
