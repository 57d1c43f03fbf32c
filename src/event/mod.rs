mod bus;
mod events;
mod handlers;

pub use bus::{EventBus, HandlerId};
pub use events::{Progress, SelectionEvent};
pub use handlers::LogEventHandler;

pub trait EventHandler: Send {
    fn handle_event(&mut self, event: &SelectionEvent);
}
