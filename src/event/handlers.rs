use std::cell::RefCell;
use std::rc::Rc;

use crate::event::{ChangeEvent, EventHandler};

/// Queue of change notifications waiting to be picked up, e.g. by a
/// re-render scheduler that runs once per frame.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<ChangeEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler feeding this log, ready for [`EventBus::subscribe`](crate::event::EventBus::subscribe)
    pub fn handler(&self) -> Box<dyn EventHandler> {
        let events = Rc::clone(&self.events);
        Box::new(move |event: &ChangeEvent| events.borrow_mut().push(event.clone()))
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Takes every event recorded so far
    pub fn drain(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}
