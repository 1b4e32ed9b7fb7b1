use std::borrow::Cow;

/// Boxed error returned by a failing handler.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported to the bus error hook while emitting an event.
///
/// None of these ever propagate out of [`EventBus::emit`](crate::EventBus::emit);
/// they are delivered to the hook configured with
/// [`EventBusBuilder::on_error`](crate::EventBusBuilder::on_error).
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    /// A handler returned an error.
    #[error("Handler failed{}: {source}", format_context(.context))]
    Handler {
        #[source]
        source: HandlerError,
        context: Option<Cow<'static, str>>,
    },

    /// A handler panicked while being invoked.
    #[error("Handler panicked{}: {message}", format_context(.context))]
    HandlerPanicked { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A registration expects a payload type other than the one emitted.
    /// Happens when two topics share a key but disagree on the payload.
    #[error("Type mismatch{}: {message}", format_context(.context))]
    TypeMismatch { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl From<HandlerError> for EventBusError {
    #[inline]
    fn from(source: HandlerError) -> Self {
        Self::Handler { source, context: None }
    }
}

/// Adds `.context(...)` to results carrying bus or handler errors.
pub trait EventBusErrorExt<T> {
    /// Attaches (or replaces) the context of the error, if any.
    ///
    /// # Errors
    /// Returns the original error converted into [`EventBusError`].
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, EventBusError>;
}

impl<T> EventBusErrorExt<T> for Result<T, EventBusError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                EventBusError::Handler { context: c, .. }
                | EventBusError::HandlerPanicked { context: c, .. }
                | EventBusError::TypeMismatch { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl<T> EventBusErrorExt<T> for Result<T, HandlerError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T, EventBusError> {
        self.map_err(|source| EventBusError::Handler { source, context: Some(context.into()) })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}
