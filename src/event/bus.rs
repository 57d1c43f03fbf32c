use std::cell::RefCell;

use log::trace;

use crate::event::{EventHandler, SelectionEvent};

/// Token returned by [`EventBus::subscribe`], used to detach a handler again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(usize);

/// Broadcasts model notifications to registered handlers, in subscription order
pub struct EventBus {
    handlers: RefCell<Vec<(HandlerId, Box<dyn EventHandler>)>>,
    next_id: RefCell<usize>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.borrow().len()))
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: RefCell::new(Vec::new()),
            next_id: RefCell::new(0),
        }
    }

    /// Subscribe a handler to receive events
    pub fn subscribe(&self, handler: Box<dyn EventHandler>) -> HandlerId {
        let mut next = self.next_id.borrow_mut();
        let id = HandlerId(*next);
        *next += 1;
        self.handlers.borrow_mut().push((id, handler));
        id
    }

    /// Detach a handler. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Emit an event to all registered handlers.
    ///
    /// Handlers must not subscribe or unsubscribe from inside `handle_event`.
    pub fn emit(&self, event: SelectionEvent) {
        trace!("emit {event:?}");
        for (_, handler) in self.handlers.borrow_mut().iter_mut() {
            handler.handle_event(&event);
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_unsubscribed_handler_stops_receiving() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = bus.subscribe(Box::new(move |_: &SelectionEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        bus.emit(SelectionEvent::PathChanged);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(SelectionEvent::PathChanged);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.handler_count(), 0);
    }
}
