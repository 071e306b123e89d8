use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading a [`LifecycleConfig`].
///
/// [`LifecycleConfig`]: crate::config::LifecycleConfig
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path:?}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Parsed fine but describes a run that cannot happen.
    #[error("invalid config: {0}")]
    Invalid(String),
}
