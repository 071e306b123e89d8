use std::{error::Error, sync::Arc};

/// Receives the notifications an observable produces.
///
/// Implemented by [`Subscriber`] (the user supplied listener) and by [`Emitter`]
/// (the delivery channel a producer pushes into).
///
/// [`Subscriber`]: crate::subscribe::Subscriber
/// [`Emitter`]: crate::subscribe::Emitter
pub trait Observer {
    type NextFnType;

    fn next(&mut self, _: Self::NextFnType);
    fn complete(&mut self);
    fn error(&mut self, _: Arc<dyn Error + Send + Sync>);
}
