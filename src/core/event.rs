//! Typed event with priority-ordered dispatch. The dispatcher is one of the
//! shared-state islands other threads may touch, so the listener table sits
//! behind a mutex and handlers are panic-isolated.

use log::error;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Variant-typed payload value.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl EventValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            EventValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            EventValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            EventValue::Float(v) => Some(*v),
            EventValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            EventValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// A dispatched event: type, source, variant data, any-typed data, and the
/// handled/cancelled flags listeners use to stop propagation.
pub struct Event {
    event_type: String,
    source: String,
    data: HashMap<String, EventValue>,
    any_data: HashMap<String, Box<dyn Any + Send>>,
    handled: bool,
    cancelled: bool,
}

impl Event {
    pub fn new(event_type: &str, source: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            source: source.to_string(),
            data: HashMap::new(),
            any_data: HashMap::new(),
            handled: false,
            cancelled: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn set_data(&mut self, key: &str, value: EventValue) {
        self.data.insert(key.to_string(), value);
    }

    pub fn data(&self, key: &str) -> Option<&EventValue> {
        self.data.get(key)
    }

    pub fn int_data(&self, key: &str) -> Option<i64> {
        self.data.get(key).and_then(EventValue::as_int)
    }

    pub fn has_data(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn set_any_data<T: Any + Send>(&mut self, key: &str, value: T) {
        self.any_data.insert(key.to_string(), Box::new(value));
    }

    pub fn any_data<T: Any>(&self, key: &str) -> Option<&T> {
        self.any_data.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    pub fn set_handled(&mut self) {
        self.handled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn set_cancelled(&mut self) {
        self.cancelled = true;
    }
}

pub type ListenerId = u64;

type Listener = Arc<Mutex<dyn FnMut(&mut Event) + Send>>;

struct ListenerEntry {
    id: ListenerId,
    priority: i32,
    handler: Listener,
}

/// Dispatches events to listeners sorted ascending by priority; insertion
/// order is preserved within equal priority.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Mutex<HashMap<String, Vec<ListenerEntry>>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&self, event_type: &str, handler: F, priority: i32) -> ListenerId
    where
        F: FnMut(&mut Event) + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.listeners.lock();
        let entries = listeners.entry(event_type.to_string()).or_default();
        let entry = ListenerEntry {
            id,
            priority,
            handler: Arc::new(Mutex::new(handler)),
        };
        // Stable insert: after every existing entry of the same priority
        let pos = entries
            .iter()
            .position(|e| e.priority > priority)
            .unwrap_or(entries.len());
        entries.insert(pos, entry);
        id
    }

    pub fn remove_listener(&self, event_type: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        if let Some(entries) = listeners.get_mut(event_type) {
            let before = entries.len();
            entries.retain(|e| e.id != id);
            return entries.len() != before;
        }
        false
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .lock()
            .get(event_type)
            .map_or(0, |entries| entries.len())
    }

    /// Invoke listeners in order. Stops on the first listener that sets
    /// `cancelled` or `handled`; returns whether the event was handled.
    /// Listener panics are logged and do not stop dispatch.
    pub fn dispatch(&self, event: &mut Event) -> bool {
        let handlers: Vec<Listener> = {
            let listeners = self.listeners.lock();
            match listeners.get(event.event_type()) {
                Some(entries) => entries.iter().map(|e| Arc::clone(&e.handler)).collect(),
                None => return false,
            }
        };

        for handler in handlers {
            let result = catch_unwind(AssertUnwindSafe(|| {
                (*handler.lock())(event);
            }));
            if result.is_err() {
                error!("event listener panicked for '{}'", event.event_type());
            }
            if event.is_cancelled() || event.is_handled() {
                break;
            }
        }

        event.is_handled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_priority_order_then_insertion_order() {
        let dispatcher = EventDispatcher::new();
        let trace = Arc::new(Mutex::new(Vec::new()));

        for (label, priority) in [("late", 10), ("early_a", 0), ("early_b", 0)] {
            let trace = Arc::clone(&trace);
            dispatcher.add_listener(
                "test",
                move |_e| {
                    trace.lock().push(label);
                },
                priority,
            );
        }

        let mut event = Event::new("test", "unit");
        dispatcher.dispatch(&mut event);
        assert_eq!(*trace.lock(), vec!["early_a", "early_b", "late"]);
    }

    #[test]
    fn test_handled_stops_dispatch_and_returns_true() {
        let dispatcher = EventDispatcher::new();
        let later_ran = Arc::new(AtomicUsize::new(0));

        dispatcher.add_listener("test", |e| e.set_handled(), 0);
        let later = Arc::clone(&later_ran);
        dispatcher.add_listener(
            "test",
            move |_e| {
                later.fetch_add(1, Ordering::SeqCst);
            },
            1,
        );

        let mut event = Event::new("test", "unit");
        assert!(dispatcher.dispatch(&mut event));
        assert_eq!(later_ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_stops_dispatch_and_returns_false() {
        let dispatcher = EventDispatcher::new();
        dispatcher.add_listener("test", |e| e.set_cancelled(), 0);
        let reached = Arc::new(AtomicUsize::new(0));
        let later = Arc::clone(&reached);
        dispatcher.add_listener(
            "test",
            move |_e| {
                later.fetch_add(1, Ordering::SeqCst);
            },
            1,
        );

        let mut event = Event::new("test", "unit");
        assert!(!dispatcher.dispatch(&mut event));
        assert_eq!(reached.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_panic_does_not_stop_dispatch() {
        let dispatcher = EventDispatcher::new();
        dispatcher.add_listener("test", |_e| panic!("listener blew up"), 0);
        let reached = Arc::new(AtomicUsize::new(0));
        let later = Arc::clone(&reached);
        dispatcher.add_listener(
            "test",
            move |_e| {
                later.fetch_add(1, Ordering::SeqCst);
            },
            1,
        );

        let mut event = Event::new("test", "unit");
        dispatcher.dispatch(&mut event);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_listener() {
        let dispatcher = EventDispatcher::new();
        let id = dispatcher.add_listener("test", |_e| {}, 0);
        assert!(dispatcher.remove_listener("test", id));
        assert!(!dispatcher.remove_listener("test", id));
        assert_eq!(dispatcher.listener_count("test"), 0);
    }

    #[test]
    fn test_event_data_access() {
        let mut event = Event::new("voxel_changed", "interaction");
        event.set_data("cx", EventValue::Int(3));
        event.set_any_data("payload", vec![1u8, 2, 3]);

        assert_eq!(event.int_data("cx"), Some(3));
        assert!(event.has_data("cx"));
        assert_eq!(event.any_data::<Vec<u8>>("payload").unwrap(), &[1, 2, 3]);
        assert!(event.any_data::<String>("payload").is_none());
    }
}
