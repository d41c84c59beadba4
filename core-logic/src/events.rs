//! # Spam Events
//!
//! Operator-facing events emitted by the spam loop. Every event is logged
//! under the `spam_event` tracing target and forwarded to an optional
//! observer. A panicking observer is ignored; the loop never depends on it.

use chrono::Local;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Debug => "debug",
            EventLevel::Info => "info",
            EventLevel::Warn => "warn",
            EventLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpamEvent {
    pub level: EventLevel,
    pub message: String,
}

type Handler = Arc<dyn Fn(&SpamEvent) + Send + Sync>;

/// Fan-out point between the loop and its single observer.
///
/// Clones share the registered handler, so a handle held by the presentation
/// layer can swap the observer while the loop is running.
#[derive(Clone, Default)]
pub struct EventEmitter {
    handler: Arc<RwLock<Option<Handler>>>,
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventEmitter")
            .field("has_handler", &self.has_handler())
            .finish()
    }
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&SpamEvent) + Send + Sync + 'static,
    {
        let mut slot = self.handler.write().unwrap_or_else(|p| p.into_inner());
        *slot = Some(Arc::new(handler));
    }

    pub fn remove_handler(&self) {
        let mut slot = self.handler.write().unwrap_or_else(|p| p.into_inner());
        *slot = None;
    }

    pub fn has_handler(&self) -> bool {
        self.handler
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }

    pub fn emit(&self, level: EventLevel, message: impl Into<String>) {
        let event = SpamEvent {
            level,
            message: message.into(),
        };

        match level {
            EventLevel::Debug => debug!(target: "spam_event", "{}", event.message),
            EventLevel::Info => info!(target: "spam_event", "{}", event.message),
            EventLevel::Warn => warn!(target: "spam_event", "{}", event.message),
            EventLevel::Error => error!(target: "spam_event", "{}", event.message),
        }

        // Clone the handler out so it runs without the lock held.
        let handler = match self.handler.read() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if let Some(handler) = handler {
            let _ = catch_unwind(AssertUnwindSafe(|| handler(&event)));
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.emit(EventLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(EventLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(EventLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(EventLevel::Error, message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedEvent {
    pub time: String,
    pub level: EventLevel,
    pub message: String,
}

/// Bounded, timestamped history of events, newest first.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: Arc<Mutex<VecDeque<LoggedEvent>>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, event: &SpamEvent) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.push_front(LoggedEvent {
            time: Local::now().format("%H:%M:%S").to_string(),
            level: event.level,
            message: event.message.clone(),
        });
        entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> Vec<LoggedEvent> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.clear();
    }

    /// Observer closure that records into this log, for [`EventEmitter::set_handler`].
    pub fn handler(&self) -> impl Fn(&SpamEvent) + Send + Sync + 'static {
        let log = self.clone();
        move |event| log.record(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_handler_receives_events() {
        let emitter = EventEmitter::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        emitter.set_handler(move |e| sink.lock().unwrap().push(e.clone()));

        emitter.info("Starting");
        emitter.debug("Fetching onchain data");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].level, EventLevel::Info);
        assert_eq!(seen[1].message, "Fetching onchain data");
    }

    #[test]
    fn test_remove_handler_stops_delivery() {
        let emitter = EventEmitter::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        emitter.set_handler(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        emitter.info("one");
        emitter.remove_handler();
        emitter.info("two");
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!emitter.has_handler());
    }

    #[test]
    fn test_panicking_handler_is_swallowed() {
        let emitter = EventEmitter::new();
        emitter.set_handler(|_| panic!("observer blew up"));
        emitter.warn("still fine");
        emitter.error("still fine");
        assert!(emitter.has_handler());
    }

    #[test]
    fn test_event_log_is_bounded_newest_first() {
        let log = EventLog::new(2);
        let emitter = EventEmitter::new();
        emitter.set_handler(log.handler());

        emitter.info("first");
        emitter.info("second");
        emitter.info("third");

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "third");
        assert_eq!(entries[1].message, "second");

        log.clear();
        assert!(log.is_empty());
    }
}
