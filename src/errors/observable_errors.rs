use std::error::Error as StdError;

use thiserror::Error;

/// Error a producer can deliver through [`Observer::error`].
///
/// Listeners receive it as `Arc<dyn Error + Send + Sync>`, so producers are free to
/// emit any error type; this enum covers the common cases.
///
/// [`Observer::error`]: crate::Observer::error
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ObservableError {
    /// Named observable failed with an underlying cause.
    #[error("{name} observable emitted an error")]
    InfoRoot {
        name: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Underlying cause without a name.
    #[error("observable emitted an error")]
    Root(#[source] Box<dyn StdError + Send + Sync>),

    /// Free-form description.
    #[error("{0} observable emitted an error")]
    Info(String),

    #[error("observable emitted an error")]
    NoInfo,
}

impl ObservableError {
    pub fn new(name: &'static str, source: impl StdError + Send + Sync + 'static) -> Self {
        Self::InfoRoot {
            name,
            source: Box::new(source),
        }
    }

    /// Short stable label for log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::InfoRoot { .. } => "observable_info_root",
            Self::Root(_) => "observable_root",
            Self::Info(_) => "observable_info",
            Self::NoInfo => "observable_no_info",
        }
    }
}
