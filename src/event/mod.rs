mod bus;
mod events;
mod handlers;

pub use bus::EventBus;
pub use events::{ChangeEvent, LayerProperty};
pub use handlers::EventLog;

/// Receives change notifications; all mutation is single-threaded, so
/// handlers need not be `Send`.
pub trait EventHandler {
    fn handle_event(&mut self, event: &ChangeEvent);
}

impl<F> EventHandler for F
where
    F: FnMut(&ChangeEvent),
{
    fn handle_event(&mut self, event: &ChangeEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_receives_emitted_events() {
        let bus = EventBus::new();
        let log = EventLog::new();
        bus.subscribe(log.handler());
        bus.emit(ChangeEvent::Undone);
        bus.emit(ChangeEvent::CurrentLayerChanged { index: 1 });
        assert_eq!(log.len(), 2);
        assert_eq!(
            log.drain(),
            vec![ChangeEvent::Undone, ChangeEvent::CurrentLayerChanged { index: 1 }]
        );
        assert!(log.is_empty());
    }

    #[test]
    fn test_closures_subscribe_alongside_logs() {
        let bus = EventBus::new();
        assert_eq!(bus.handler_count(), 0);
        let log = EventLog::new();
        bus.subscribe(log.handler());
        let counter = std::rc::Rc::new(std::cell::Cell::new(0));
        let seen = counter.clone();
        bus.subscribe(Box::new(move |event: &ChangeEvent| {
            if *event == ChangeEvent::Undone {
                seen.set(seen.get() + 1);
            }
        }));
        assert_eq!(bus.handler_count(), 2);

        bus.emit(ChangeEvent::Undone);
        bus.emit(ChangeEvent::Redone);
        assert_eq!(counter.get(), 1);
        assert_eq!(log.len(), 2);
    }
}
