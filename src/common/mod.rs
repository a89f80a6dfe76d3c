pub mod commands;
pub mod events;
pub mod types;

pub use commands::SessionCommand;
pub use events::{SessionEvent, SessionUpdate};
pub use types::{
    EventRecord, EventType, MessageRecord, NewEvent, format_location, short_address,
    time_remaining,
};
