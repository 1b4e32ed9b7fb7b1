#![allow(dead_code, unreachable_pub)]

use evebus::{EventBusError, Handler, Topic, WildcardHandler};
use parking_lot::Mutex;
use std::sync::Arc;

pub const EVENT1: Topic<String> = Topic::new("event1");
pub const EVENT2: Topic<u32> = Topic::new("event2");
pub const EVENT3: Topic<bool> = Topic::new("event3");
pub const LIFE_LOST: Topic<Option<u32>> = Topic::new("lifeLost");

/// Shared, ordered log of everything the test handlers saw.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// A handler writing `<label>:<payload>` for every call.
    pub fn handler<P: std::fmt::Debug + 'static>(&self, label: &'static str) -> Handler<P> {
        let journal = self.clone();
        Handler::new(move |payload: &P| journal.push(format!("{label}:{payload:?}")))
    }

    /// A wildcard handler writing `<label>:<key>` for every call.
    pub fn wildcard(&self, label: &'static str) -> WildcardHandler {
        let journal = self.clone();
        WildcardHandler::new(move |event| journal.push(format!("{label}:{}", event.key())))
    }

    /// An error hook writing the rendered error.
    pub fn error_hook(&self) -> impl Fn(&EventBusError) + Send + Sync + use<> {
        let journal = self.clone();
        move |error: &EventBusError| journal.push(error.to_string())
    }
}
