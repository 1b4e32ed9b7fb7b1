use crate::error::{EventBusError, EventBusErrorExt};
use crate::handler::{
    Envelope, Handler, HandlerId, HandlerResult, IntoHandlerResult, WildcardHandler,
};
use crate::key::{EventKey, Slot, Topic};
use crate::table::{Callback, HandlerTable, PayloadType, Unsubscribe};
use parking_lot::Mutex;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, trace, warn};

type ErrorHook = Arc<dyn Fn(&EventBusError) + Send + Sync>;

#[derive(Default)]
struct BusConfig {
    initial_events: Option<HandlerTable>,
    on_error: Option<ErrorHook>,
}

/// A builder for configuring an [`EventBus`].
#[derive(Default)]
pub struct EventBusBuilder {
    config: BusConfig,
}

impl EventBusBuilder {
    /// Adopts an existing handler table instead of allocating a fresh one.
    ///
    /// The table is shared, not copied: handlers registered through the bus
    /// show up in `table` and vice versa.
    #[must_use = "The builder must be configured before it can be used to build the bus."]
    pub fn initial_events(mut self, table: HandlerTable) -> Self {
        self.config.initial_events = Some(table);
        self
    }

    /// Sets the hook receiving every handler failure raised during emission.
    ///
    /// Without a hook, failures are logged at `debug` level and discarded.
    #[must_use = "The builder must be configured before it can be used to build the bus."]
    pub fn on_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&EventBusError) + Send + Sync + 'static,
    {
        self.config.on_error = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn build(self) -> EventBus {
        EventBus {
            table: self.config.initial_events.unwrap_or_default(),
            on_error: self.config.on_error,
        }
    }
}

impl fmt::Debug for EventBusBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBusBuilder")
            .field("initial_events", &self.config.initial_events)
            .field("on_error", &self.config.on_error.is_some())
            .finish()
    }
}

/// A synchronous, thread-safe publish/subscribe bus.
///
/// Cloning a bus is cheap and yields a handle on the same handler table and
/// error hook, which is how handlers call back into the bus they run on.
#[derive(Clone, Default)]
pub struct EventBus {
    table: HandlerTable,
    on_error: Option<ErrorHook>,
}

impl EventBus {
    /// Creates a bus with an empty table and no error hook.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "The builder must be configured before it can be used to build the bus."]
    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::default()
    }

    /// The live handler table backing this bus.
    #[must_use]
    pub const fn all(&self) -> &HandlerTable {
        &self.table
    }

    /// Registers `handler` for `topic`.
    ///
    /// Registering a handler that is already present is a no-op; it keeps its
    /// original position and still runs once per emission.
    ///
    /// # Examples
    /// ```rust
    /// use evebus::{EventBus, Handler, Topic};
    /// use std::sync::{Arc, Mutex};
    ///
    /// const SCORE: Topic<u32> = Topic::new("score");
    ///
    /// let bus = EventBus::new();
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let sink = seen.clone();
    /// let handler = Handler::new(move |score: &u32| sink.lock().unwrap().push(*score));
    ///
    /// bus.on(&SCORE, &handler);
    /// bus.emit(&SCORE, 42);
    /// bus.off(&SCORE, &handler);
    /// bus.emit(&SCORE, 99);
    ///
    /// assert_eq!(*seen.lock().unwrap(), vec![42]);
    /// ```
    pub fn on<P: 'static>(&self, topic: &Topic<P>, handler: &Handler<P>) -> Unsubscribe {
        let slot = Slot::from(topic);
        if let Some(bound) = self.table.payload_type(&slot)
            && bound != PayloadType::of::<P>()
        {
            warn!(
                event = %slot,
                bound = bound.name,
                requested = std::any::type_name::<P>(),
                "Handler registered with a payload type differing from existing handlers"
            );
        }
        self.table.register(topic, handler);
        self.table.unsubscribe_handle(slot, handler.id())
    }

    /// Wraps `func` into a fresh [`Handler`] and registers it for `topic`.
    pub fn subscribe<P, F, R>(&self, topic: &Topic<P>, func: F) -> Unsubscribe
    where
        P: 'static,
        F: Fn(&P) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on(topic, &Handler::new(func))
    }

    /// Registers `handler` for every emitted event.
    pub fn on_wildcard(&self, handler: &WildcardHandler) -> Unsubscribe {
        self.table.register_wildcard(handler);
        self.table.unsubscribe_handle(Slot::Wildcard, handler.id())
    }

    /// Wraps `func` into a fresh [`WildcardHandler`] and registers it.
    pub fn subscribe_wildcard<F, R>(&self, func: F) -> Unsubscribe
    where
        F: Fn(&Envelope<'_>) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.on_wildcard(&WildcardHandler::new(func))
    }

    /// Registers `func` for the next emission of `topic` only.
    ///
    /// The wrapper unregisters itself right after `func` returns (or fails).
    /// `func` runs at most once, even when the topic is emitted again from
    /// inside `func`. The returned handle cancels the subscription before it
    /// fires.
    pub fn once<P, F, R>(&self, topic: &Topic<P>, func: F) -> Unsubscribe
    where
        P: 'static,
        F: FnOnce(&P) -> R + Send + 'static,
        R: IntoHandlerResult,
    {
        let id = HandlerId::next();
        let remove = self.table.unsubscribe_handle(Slot::from(topic), id);
        let pending = Mutex::new(Some(func));

        let handler = Handler::with_id(id, move |payload: &P| -> HandlerResult {
            let Some(func) = pending.lock().take() else {
                return Ok(());
            };
            let _remove = RemoveOnDrop(&remove);
            func(payload).into_handler_result()
        });

        self.on(topic, &handler)
    }

    /// Removes `handler` from `topic`. Returns `true` if it was registered.
    pub fn off<P>(&self, topic: &Topic<P>, handler: &Handler<P>) -> bool {
        self.table.remove(&Slot::from(topic), handler.id())
    }

    /// Removes every handler of `topic`, leaving other topics untouched.
    pub fn off_topic<P>(&self, topic: &Topic<P>) -> usize {
        self.table.clear_slot(&Slot::from(topic))
    }

    /// Removes one wildcard handler. Returns `true` if it was registered.
    pub fn off_wildcard(&self, handler: &WildcardHandler) -> bool {
        self.table.remove(&Slot::Wildcard, handler.id())
    }

    /// Removes every wildcard handler.
    pub fn off_wildcard_all(&self) -> usize {
        self.table.clear_slot(&Slot::Wildcard)
    }

    /// Removes every handler of every topic, wildcard included.
    pub fn clear(&self) -> usize {
        self.table.clear()
    }

    /// Emits `payload` on `topic`.
    ///
    /// Handlers of `topic` run first, in registration order, then wildcard
    /// handlers in registration order. Both sets are captured before the first
    /// handler runs, so registrations and removals made by handlers only
    /// affect later emissions.
    ///
    /// A failing or panicking handler never stops the emission: its error goes
    /// to the configured error hook and the next handler runs.
    pub fn emit<P: 'static>(&self, topic: &Topic<P>, payload: P) {
        let key = topic.key();
        let (handlers, wildcards) = self.table.snapshot_with_wildcards(&Slot::Event(key.clone()));

        trace!(
            event = %key,
            handlers = handlers.len(),
            wildcards = wildcards.len(),
            "Emitting event"
        );

        for registration in &handlers {
            if let Some(handler) = registration.handler::<P>() {
                self.invoke(key, registration.id, || handler.call(&payload));
            } else {
                warn!(
                    event = %key,
                    handler = %registration.id,
                    expected = registration.payload.name,
                    payload = std::any::type_name::<P>(),
                    "Skipping handler registered for another payload type"
                );
                self.report(&EventBusError::TypeMismatch {
                    message: format!(
                        "handler expects `{}` but `{}` was emitted",
                        registration.payload.name,
                        std::any::type_name::<P>()
                    )
                    .into(),
                    context: Some(describe(key, registration.id)),
                });
            }
        }

        let envelope = Envelope::new(key, &payload);
        for registration in &wildcards {
            if let Callback::Wildcard(handler) = &registration.callback {
                self.invoke(key, registration.id, || handler.call(&envelope));
            }
        }
    }

    /// Emits an absent payload on a topic whose payload is optional.
    pub fn emit_empty<T: 'static>(&self, topic: &Topic<Option<T>>) {
        self.emit(topic, None);
    }

    fn invoke(&self, key: &EventKey, id: HandlerId, call: impl FnOnce() -> HandlerResult) {
        let outcome = match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(result) => result.context(describe(key, id)),
            Err(payload) => Err(EventBusError::HandlerPanicked {
                message: panic_message(payload.as_ref()),
                context: Some(describe(key, id)),
            }),
        };

        if let Err(error) = outcome {
            self.report(&error);
        }
    }

    fn report(&self, error: &EventBusError) {
        match &self.on_error {
            Some(hook) => {
                trace!(%error, "Reporting handler failure");
                hook(error);
            }
            None => debug!(%error, "Handler failure discarded: no error hook configured"),
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("table", &self.table)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

struct RemoveOnDrop<'a>(&'a Unsubscribe);

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

fn describe(key: &EventKey, id: HandlerId) -> Cow<'static, str> {
    format!("event={key}, handler={id}").into()
}

fn panic_message(payload: &(dyn Any + Send)) -> Cow<'static, str> {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        Cow::Borrowed(*message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        Cow::Owned(message.clone())
    } else {
        Cow::Borrowed("non-string panic payload")
    }
}
