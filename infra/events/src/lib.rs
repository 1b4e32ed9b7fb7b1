//! # Event Bus
//!
//! A small, strongly-typed, synchronous publish/subscribe bus.
//!
//! ## Overview
//!
//! An [`EventBus`] maps event keys to ordered sets of handlers. Emitting an
//! event runs every handler of its key, then every wildcard handler, in
//! registration order, on the caller's thread.
//!
//! ## Features
//!
//! * **Typed topics**: a [`Topic<P>`] binds a key to its payload type, so
//!   handler signatures are checked at compile time.
//! * **Wildcard**: wildcard handlers observe every emission through an
//!   [`Envelope`]. The wildcard is a dedicated [`Slot`], never a key.
//! * **One-shot**: [`EventBus::once`] delivers exactly one event.
//! * **Snapshot isolation**: handlers may subscribe and unsubscribe while an
//!   emission is running; changes apply from the next emission on.
//! * **Failure isolation**: a failing or panicking handler is reported to the
//!   error hook and never stops the other handlers.
//! * **Shared table**: the [`HandlerTable`] can be seeded, inspected and shared
//!   between buses.
//! * **Thread-safe**: `FxHashMap` behind a `parking_lot::RwLock`, never held
//!   while handlers run.
//!
//! # Example
//!
//! ```rust
//! use evebus::{EventBus, EventBusError, Topic};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct PlayerEvent {
//!     player: String,
//! }
//!
//! const LEVEL_UP: Topic<String> = Topic::new("levelUp");
//! const PLAYER: Topic<PlayerEvent> = Topic::new("playerEvent");
//!
//! let errors = Arc::new(Mutex::new(Vec::new()));
//! let sink = errors.clone();
//! let bus = EventBus::builder()
//!     .on_error(move |error: &EventBusError| sink.lock().unwrap().push(error.to_string()))
//!     .build();
//!
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let levels = log.clone();
//! bus.subscribe(&LEVEL_UP, move |level: &String| levels.lock().unwrap().push(level.clone()));
//! bus.subscribe(&PLAYER, |_: &PlayerEvent| -> Result<(), String> { Err("offline".into()) });
//!
//! let seen = log.clone();
//! bus.subscribe_wildcard(move |event| {
//!     seen.lock().unwrap().push(format!("* {}", event.key()));
//! });
//!
//! bus.emit(&LEVEL_UP, "level2".to_owned());
//! bus.emit(&PLAYER, PlayerEvent { player: "John".into() });
//!
//! assert_eq!(*log.lock().unwrap(), vec!["level2", "* levelUp", "* playerEvent"]);
//! assert_eq!(errors.lock().unwrap().len(), 1);
//! ```
//!
//! Handlers must match the payload type of their topic:
//!
//! ```rust,compile_fail
//! use evebus::{EventBus, Handler, Topic};
//!
//! const LEVEL_UP: Topic<String> = Topic::new("levelUp");
//!
//! let bus = EventBus::new();
//! let handler = Handler::new(|_: &u32| {});
//! bus.on(&LEVEL_UP, &handler);
//! ```
//!
//! Payloads must match too:
//!
//! ```rust,compile_fail
//! use evebus::{EventBus, Topic};
//!
//! const SCORE: Topic<u32> = Topic::new("scoreEvent");
//!
//! EventBus::new().emit(&SCORE, "1000");
//! ```
//!
//! Only topics with an optional payload can be emitted without one:
//!
//! ```rust,compile_fail
//! use evebus::{EventBus, Topic};
//!
//! const LEVEL_UP: Topic<String> = Topic::new("levelUp");
//!
//! EventBus::new().emit_empty(&LEVEL_UP);
//! ```

mod bus;
mod error;
mod handler;
mod key;
mod table;

pub use bus::{EventBus, EventBusBuilder};
pub use error::{EventBusError, EventBusErrorExt, HandlerError};
pub use handler::{
    Envelope, Handler, HandlerId, HandlerResult, IntoHandlerResult, WildcardHandler,
};
pub use key::{EventKey, Slot, Symbol, Topic};
pub use table::{HandlerTable, Unsubscribe};
