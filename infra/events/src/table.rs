use crate::handler::{Handler, HandlerId, WildcardHandler};
use crate::key::{Slot, Topic};
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::trace;

type Slots = FxHashMap<Slot, Vec<Registration>>;

/// Type-erased entry of a handler set.
#[derive(Clone)]
pub(crate) struct Registration {
    pub(crate) id: HandlerId,
    pub(crate) payload: PayloadType,
    pub(crate) callback: Callback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PayloadType {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
}

impl PayloadType {
    pub(crate) fn of<P: ?Sized + 'static>() -> Self {
        Self { id: TypeId::of::<P>(), name: std::any::type_name::<P>() }
    }
}

#[derive(Clone)]
pub(crate) enum Callback {
    /// Holds a `Handler<P>` for the registration's payload type.
    Typed(Arc<dyn Any + Send + Sync>),
    Wildcard(WildcardHandler),
}

impl Registration {
    fn typed<P: 'static>(handler: &Handler<P>) -> Self {
        Self {
            id: handler.id(),
            payload: PayloadType::of::<P>(),
            callback: Callback::Typed(Arc::new(handler.clone())),
        }
    }

    fn wildcard(handler: &WildcardHandler) -> Self {
        Self {
            id: handler.id(),
            payload: PayloadType::of::<dyn Any>(),
            callback: Callback::Wildcard(handler.clone()),
        }
    }

    /// Recovers the typed handler, `None` if it was registered for another payload type.
    pub(crate) fn handler<P: 'static>(&self) -> Option<&Handler<P>> {
        match &self.callback {
            Callback::Typed(any) => any.downcast_ref::<Handler<P>>(),
            Callback::Wildcard(_) => None,
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("payload", &self.payload.name)
            .finish_non_exhaustive()
    }
}

/// The shared handler table: every slot and its ordered handler set.
///
/// A `HandlerTable` is a reference-counted handle. Cloning it, passing it to
/// [`EventBusBuilder::initial_events`](crate::EventBusBuilder::initial_events)
/// or reading it back through [`EventBus::all`](crate::EventBus::all) all
/// address the same table, so handlers seeded through one handle are seen by
/// every bus built on it.
///
/// Handler sets keep insertion order and hold each [`HandlerId`] at most once.
/// A slot whose last handler is removed disappears from the table.
#[derive(Clone, Default)]
pub struct HandlerTable {
    slots: Arc<RwLock<Slots>>,
}

impl HandlerTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `handler` to the set of `topic`. Returns `false` if it was already there.
    pub fn register<P: 'static>(&self, topic: &Topic<P>, handler: &Handler<P>) -> bool {
        self.insert(Slot::from(topic), Registration::typed(handler))
    }

    /// Adds `handler` to the wildcard set. Returns `false` if it was already there.
    pub fn register_wildcard(&self, handler: &WildcardHandler) -> bool {
        self.insert(Slot::Wildcard, Registration::wildcard(handler))
    }

    /// Removes handler `id` from `slot`. Returns `true` if it was registered.
    pub fn remove(&self, slot: &Slot, id: HandlerId) -> bool {
        let mut slots = self.slots.write();
        let Some(set) = slots.get_mut(slot) else {
            return false;
        };
        let before = set.len();
        set.retain(|registration| registration.id != id);
        let removed = set.len() != before;
        if set.is_empty() {
            slots.remove(slot);
        }
        drop(slots);

        if removed {
            trace!(event = %slot, handler = %id, "Handler removed");
        }
        removed
    }

    /// Removes every handler of `slot`. Returns how many were removed.
    pub fn clear_slot(&self, slot: &Slot) -> usize {
        let removed = self.slots.write().remove(slot).map_or(0, |set| set.len());
        trace!(event = %slot, removed, "Slot cleared");
        removed
    }

    /// Removes every handler of every slot. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let removed = {
            let mut slots = self.slots.write();
            let count = slots.values().map(Vec::len).sum();
            slots.clear();
            count
        };
        trace!(removed, "Handler table cleared");
        removed
    }

    /// Number of slots holding at least one handler.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    /// Slots holding at least one handler, in no particular order.
    #[must_use]
    pub fn slots(&self) -> Vec<Slot> {
        self.slots.read().keys().cloned().collect()
    }

    /// Number of handlers registered under `slot`.
    #[must_use]
    pub fn handler_count(&self, slot: &Slot) -> usize {
        self.slots.read().get(slot).map_or(0, Vec::len)
    }

    /// Handlers registered under `slot`, in registration order.
    #[must_use]
    pub fn handler_ids(&self, slot: &Slot) -> Vec<HandlerId> {
        self.slots
            .read()
            .get(slot)
            .map(|set| set.iter().map(|registration| registration.id).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, slot: &Slot, id: HandlerId) -> bool {
        self.slots
            .read()
            .get(slot)
            .is_some_and(|set| set.iter().any(|registration| registration.id == id))
    }

    /// Whether two handles address the same table.
    #[must_use]
    pub fn same_table(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }

    /// Copies the ordered handler set of `slot` and the wildcard set under one
    /// read lock, so they can be invoked without it.
    pub(crate) fn snapshot_with_wildcards(
        &self,
        slot: &Slot,
    ) -> (Vec<Registration>, Vec<Registration>) {
        let slots = self.slots.read();
        let handlers = slots.get(slot).cloned().unwrap_or_default();
        let wildcards = slots.get(&Slot::Wildcard).cloned().unwrap_or_default();
        (handlers, wildcards)
    }

    /// Payload type already bound to `slot` by a registration, if any.
    pub(crate) fn payload_type(&self, slot: &Slot) -> Option<PayloadType> {
        self.slots.read().get(slot).and_then(|set| set.first()).map(|r| r.payload)
    }

    pub(crate) fn unsubscribe_handle(&self, slot: Slot, id: HandlerId) -> Unsubscribe {
        Unsubscribe { slots: Arc::downgrade(&self.slots), slot, id }
    }

    fn insert(&self, slot: Slot, registration: Registration) -> bool {
        let id = registration.id;
        let inserted = {
            let mut slots = self.slots.write();
            let set = slots.entry(slot.clone()).or_default();
            if set.iter().any(|existing| existing.id == id) {
                false
            } else {
                set.push(registration);
                true
            }
        };

        if inserted {
            trace!(event = %slot, handler = %id, "Handler registered");
        } else {
            trace!(event = %slot, handler = %id, "Handler already registered");
        }
        inserted
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read();
        let mut map = f.debug_map();
        for (slot, set) in slots.iter() {
            map.entry(slot, set);
        }
        map.finish()
    }
}

/// Removes one registration from its table when called.
///
/// Calling [`Unsubscribe::unsubscribe`] more than once is harmless; only the
/// first call can find the registration. The handle only weakly references
/// the table and never keeps it alive.
#[derive(Debug, Clone)]
pub struct Unsubscribe {
    slots: Weak<RwLock<Slots>>,
    slot: Slot,
    id: HandlerId,
}

impl Unsubscribe {
    /// Removes the registration. Returns `true` if it was still registered.
    pub fn unsubscribe(&self) -> bool {
        self.slots
            .upgrade()
            .is_some_and(|slots| HandlerTable { slots }.remove(&self.slot, self.id))
    }

    #[must_use]
    pub const fn slot(&self) -> &Slot {
        &self.slot
    }

    #[must_use]
    pub const fn id(&self) -> HandlerId {
        self.id
    }
}
