use std::cell::RefCell;
use std::fmt;

use log::trace;

use crate::event::{ChangeEvent, EventHandler};

/// Fans each [`ChangeEvent`] out to every subscriber, in subscription order.
///
/// Subscribing takes `&self` so a manager can hand out its bus while it is
/// borrowed elsewhere.
#[derive(Default)]
pub struct EventBus {
    handlers: RefCell<Vec<Box<dyn EventHandler>>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handler_count", &self.handler_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.handlers.borrow_mut().push(handler);
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.borrow().len()
    }

    /// Handlers must not subscribe from inside `handle_event`.
    pub fn emit(&self, event: ChangeEvent) {
        let mut handlers = self.handlers.borrow_mut();
        trace!("Emitting {:?} to {} handlers", event, handlers.len());
        for handler in handlers.iter_mut() {
            handler.handle_event(&event);
        }
    }
}
