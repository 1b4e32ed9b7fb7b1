use crate::error::HandlerError;
use crate::key::{EventKey, Topic};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_HANDLER: AtomicU64 = AtomicU64::new(1);

/// Outcome of a single handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

type HandlerFn<P> = dyn Fn(&P) -> HandlerResult + Send + Sync;
type WildcardFn = dyn Fn(&Envelope<'_>) -> HandlerResult + Send + Sync;

/// Return types accepted from handler closures.
///
/// Implemented for `()` (infallible handlers) and for `Result<(), E>` whenever
/// `E` converts into a [`HandlerError`].
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for () {
    #[inline]
    fn into_handler_result(self) -> HandlerResult {
        Ok(())
    }
}

impl<E: Into<HandlerError>> IntoHandlerResult for Result<(), E> {
    #[inline]
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

/// Identity of a registered handler. Clones of a handler share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed event handler.
///
/// The handler identity is fixed at construction; registering the same handler
/// (or a clone of it) twice under one topic keeps a single registration, and
/// [`EventBus::off`](crate::EventBus::off) removes it by that identity.
pub struct Handler<P> {
    id: HandlerId,
    func: Arc<HandlerFn<P>>,
}

impl<P: 'static> Handler<P> {
    #[must_use]
    pub fn new<F, R>(func: F) -> Self
    where
        F: Fn(&P) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self::with_id(HandlerId::next(), func)
    }

    pub(crate) fn with_id<F, R>(id: HandlerId, func: F) -> Self
    where
        F: Fn(&P) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self { id, func: Arc::new(move |payload: &P| func(payload).into_handler_result()) }
    }
}

impl<P> Handler<P> {
    #[must_use]
    pub const fn id(&self) -> HandlerId {
        self.id
    }

    /// Invokes the handler directly, outside of any bus.
    ///
    /// # Errors
    /// Returns whatever the wrapped closure returns.
    pub fn call(&self, payload: &P) -> HandlerResult {
        (self.func)(payload)
    }
}

impl<P> Clone for Handler<P> {
    fn clone(&self) -> Self {
        Self { id: self.id, func: Arc::clone(&self.func) }
    }
}

impl<P> PartialEq for Handler<P> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<P> Eq for Handler<P> {}

impl<P> fmt::Debug for Handler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("payload", &std::any::type_name::<P>())
            .finish_non_exhaustive()
    }
}

/// A handler observing every emitted event.
pub struct WildcardHandler {
    id: HandlerId,
    func: Arc<WildcardFn>,
}

impl WildcardHandler {
    #[must_use]
    pub fn new<F, R>(func: F) -> Self
    where
        F: Fn(&Envelope<'_>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        Self {
            id: HandlerId::next(),
            func: Arc::new(move |envelope: &Envelope<'_>| func(envelope).into_handler_result()),
        }
    }

    #[must_use]
    pub const fn id(&self) -> HandlerId {
        self.id
    }

    /// Invokes the handler directly, outside of any bus.
    ///
    /// # Errors
    /// Returns whatever the wrapped closure returns.
    pub fn call(&self, envelope: &Envelope<'_>) -> HandlerResult {
        (self.func)(envelope)
    }
}

impl Clone for WildcardHandler {
    fn clone(&self) -> Self {
        Self { id: self.id, func: Arc::clone(&self.func) }
    }
}

impl PartialEq for WildcardHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WildcardHandler {}

impl fmt::Debug for WildcardHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WildcardHandler").field("id", &self.id).finish_non_exhaustive()
    }
}

/// What a wildcard handler receives: the emitted key and its payload.
///
/// The payload is type-erased; resolve it against the topics the handler
/// knows about:
///
/// ```rust
/// use evebus::{EventBus, Topic};
///
/// const SCORE: Topic<u32> = Topic::new("score");
/// const NAME: Topic<String> = Topic::new("name");
///
/// let bus = EventBus::new();
/// bus.subscribe_wildcard(|event| {
///     if let Some(score) = event.payload_for(&SCORE) {
///         assert_eq!(*score, 7);
///     } else if let Some(name) = event.payload_for(&NAME) {
///         assert_eq!(name, "ada");
///     }
/// });
/// bus.emit(&SCORE, 7);
/// bus.emit(&NAME, "ada".to_owned());
/// ```
#[derive(Clone, Copy)]
pub struct Envelope<'a> {
    key: &'a EventKey,
    payload: &'a dyn Any,
    payload_type: &'static str,
}

impl<'a> Envelope<'a> {
    /// Wraps a payload emitted under `key`.
    #[must_use]
    pub fn new<P: 'static>(key: &'a EventKey, payload: &'a P) -> Self {
        Self { key, payload, payload_type: std::any::type_name::<P>() }
    }

    #[must_use]
    pub const fn key(&self) -> &'a EventKey {
        self.key
    }

    /// Name of the payload type, for diagnostics.
    #[must_use]
    pub const fn payload_type(&self) -> &'static str {
        self.payload_type
    }

    /// Returns the payload when it is a `P`, whatever the key.
    #[must_use]
    pub fn downcast<P: 'static>(&self) -> Option<&'a P> {
        self.payload.downcast_ref::<P>()
    }

    /// Returns the payload when this envelope was emitted on `topic`.
    #[must_use]
    pub fn payload_for<P: 'static>(&self, topic: &Topic<P>) -> Option<&'a P> {
        if self.key == topic.key() { self.downcast() } else { None }
    }

    /// Whether this envelope was emitted on `topic`.
    #[must_use]
    pub fn is<P: 'static>(&self, topic: &Topic<P>) -> bool {
        self.payload_for(topic).is_some()
    }
}

impl fmt::Debug for Envelope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("key", self.key)
            .field("payload", &self.payload_type)
            .finish()
    }
}
