//! Error types surfaced by observables and by configuration loading.
mod config_errors;
mod observable_errors;

pub use config_errors::*;
pub use observable_errors::*;
