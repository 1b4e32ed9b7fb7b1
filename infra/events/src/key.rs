use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

/// A process-unique opaque token usable as an event key.
///
/// Symbols compare by identity: two symbols created with the same description
/// are different keys. Clones of one symbol are equal.
#[derive(Clone)]
pub struct Symbol {
    id: u64,
    description: Cow<'static, str>,
}

impl Symbol {
    /// Creates a new symbol. The description is only used for display.
    #[must_use]
    pub fn new(description: impl Into<Cow<'static, str>>) -> Self {
        Self { id: NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed), description: description.into() }
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}#{})", self.description, self.id)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description)
    }
}

/// Identifier of an event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKey {
    /// String key, compared by value.
    Name(Cow<'static, str>),
    /// Opaque token, compared by identity.
    Symbol(Symbol),
}

impl EventKey {
    /// Returns the key name, if this is a string key.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Symbol(_) => None,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Symbol(symbol) => fmt::Display::fmt(symbol, f),
        }
    }
}

impl From<&'static str> for EventKey {
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for EventKey {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl From<Symbol> for EventKey {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

/// A slot of the handler table: a concrete event key or the wildcard.
///
/// The wildcard is its own variant, so no event key (not even one named `"*"`)
/// can ever address it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Event(EventKey),
    Wildcard,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(key) => fmt::Display::fmt(key, f),
            Self::Wildcard => f.write_str("<wildcard>"),
        }
    }
}

impl From<EventKey> for Slot {
    fn from(key: EventKey) -> Self {
        Self::Event(key)
    }
}

impl<P> From<&Topic<P>> for Slot {
    fn from(topic: &Topic<P>) -> Self {
        Self::Event(topic.key.clone())
    }
}

/// An event key bound to its payload type.
///
/// Topics are the schema of the bus: handlers, emission and removal are all
/// typed by the topic, so a handler for a `Topic<u32>` cannot be attached to a
/// `Topic<String>`. Declare topics once and share them:
///
/// ```rust
/// use evebus::Topic;
///
/// const LEVEL_UP: Topic<String> = Topic::new("levelUp");
/// const LIFE_LOST: Topic<Option<u32>> = Topic::new("lifeLost");
///
/// assert_eq!(LEVEL_UP.key().to_string(), "levelUp");
/// # let _ = LIFE_LOST;
/// ```
pub struct Topic<P> {
    key: EventKey,
    payload: PhantomData<fn(&P)>,
}

impl<P> Topic<P> {
    /// Creates a topic for a static string key.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self { key: EventKey::Name(Cow::Borrowed(name)), payload: PhantomData }
    }

    /// Creates a topic for any string key.
    ///
    /// A topic that is built and dropped subscribes to nothing:
    ///
    /// ```rust,compile_fail
    /// #![deny(unused_must_use)]
    /// evebus::Topic::<u32>::named(format!("score-{}", 1));
    /// ```
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self { key: EventKey::Name(name.into()), payload: PhantomData }
    }

    /// Creates a topic keyed by a fresh [`Symbol`].
    #[must_use]
    pub fn unique(description: impl Into<Cow<'static, str>>) -> Self {
        Self { key: EventKey::Symbol(Symbol::new(description)), payload: PhantomData }
    }

    /// Creates a topic for an existing key.
    #[must_use]
    pub const fn with_key(key: EventKey) -> Self {
        Self { key, payload: PhantomData }
    }

    #[must_use]
    pub const fn key(&self) -> &EventKey {
        &self.key
    }
}

impl<P> Clone for Topic<P> {
    fn clone(&self) -> Self {
        Self { key: self.key.clone(), payload: PhantomData }
    }
}

impl<P> PartialEq for Topic<P> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<P> Eq for Topic<P> {}

impl<P> fmt::Debug for Topic<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("key", &self.key)
            .field("payload", &std::any::type_name::<P>())
            .finish()
    }
}
