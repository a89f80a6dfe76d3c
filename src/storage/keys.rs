//! Key names inside the contract store. These are shared with every other
//! client writing to the same contract and must not change.

/// JSON array of every event id ever created.
pub const EVENT_KEYS: &str = "event_keys";

pub fn event_key(event_id: &str) -> String {
    format!("event_{event_id}")
}

pub fn message_keys_key(event_id: &str) -> String {
    format!("messages_{event_id}_keys")
}

pub fn message_key(event_id: &str, message_id: &str) -> String {
    format!("message_{event_id}_{message_id}")
}
