use super::types::{EventRecord, MessageRecord};
use crate::session::{FeedMessage, TransactionStatus};

/// Sự kiện từ các tác vụ nền gửi về session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    ParticipantTick {
        event_id: String,
        count: u32,
    },
    MessageRevealed {
        event_id: String,
        message_id: String,
        text: String,
    },
    RevealFailed {
        event_id: String,
        message_id: String,
    },
    StatusExpired(u64),
}

/// Cập nhật gửi lên UI.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    EventsLoaded(Vec<EventRecord>),
    EventOpened(EventRecord),
    MessagesLoaded(Vec<FeedMessage>),
    MessagePosted(MessageRecord),
    ParticipantCount(u32),
    MessageRevealed { message_id: String, text: String },
    RevealFailed { message_id: String },
    Status(Option<TransactionStatus>),
    Left,
}
