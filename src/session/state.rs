use crate::codec::reveal_text;
use crate::common::{EventRecord, MessageRecord};

pub const OPAQUE_PLACEHOLDER: &str = "[Encrypted Message - Click to decrypt]";
pub const REVEAL_FAILED_PLACEHOLDER: &str = "[Encrypted Message]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Browsing,
    Joined(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Pending,
    Success,
    Error,
}

/// Transient transaction banner. `generation` tells a scheduled dismissal
/// whether the banner it was meant for is still the one showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionStatus {
    pub kind: StatusKind,
    pub message: String,
    pub generation: u64,
}

/// One row of the message feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMessage {
    pub record: MessageRecord,
    /// Sent by the connected wallet.
    pub own: bool,
    /// Plain text once a reveal succeeded.
    pub revealed: Option<String>,
    /// Last reveal attempt was declined.
    pub reveal_failed: bool,
}

impl FeedMessage {
    pub fn new(record: MessageRecord, own_address: Option<&str>) -> Self {
        let own = own_address.is_some_and(|address| address == record.sender);
        Self {
            record,
            own,
            revealed: None,
            reveal_failed: false,
        }
    }

    /// What the feed shows for this row. Own messages are always readable.
    pub fn display_text(&self) -> String {
        if let Some(text) = &self.revealed {
            return text.clone();
        }
        if self.own {
            return reveal_text(&self.record.content)
                .unwrap_or_else(|_| self.record.content.clone());
        }
        if self.reveal_failed {
            REVEAL_FAILED_PLACEHOLDER.to_string()
        } else {
            OPAQUE_PLACEHOLDER.to_string()
        }
    }

    pub fn needs_reveal(&self) -> bool {
        !self.own && self.revealed.is_none()
    }
}

/// Trạng thái cục bộ của session.
#[derive(Debug, Clone)]
pub struct AppState {
    pub mode: SessionMode,
    pub events: Vec<EventRecord>,
    pub active_event: Option<EventRecord>,
    pub messages: Vec<FeedMessage>,
    /// Display-only figure, moved around by the participant refresher.
    pub participant_count: u32,
    pub status: Option<TransactionStatus>,
    pub decrypting: bool,
    status_generation: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            mode: SessionMode::Browsing,
            events: Vec::new(),
            active_event: None,
            messages: Vec::new(),
            participant_count: 0,
            status: None,
            decrypting: false,
            status_generation: 0,
        }
    }

    pub fn active_event_id(&self) -> Option<&str> {
        match &self.mode {
            SessionMode::Joined(id) => Some(id.as_str()),
            SessionMode::Browsing => None,
        }
    }

    pub fn enter_event(&mut self, event: EventRecord, participant_count: u32) {
        self.mode = SessionMode::Joined(event.id.clone());
        self.active_event = Some(event);
        self.participant_count = participant_count;
        self.messages.clear();
        self.decrypting = false;
    }

    pub fn leave_event(&mut self) {
        self.mode = SessionMode::Browsing;
        self.active_event = None;
        self.messages.clear();
        self.participant_count = 0;
        self.decrypting = false;
    }

    /// Replace the feed, keeping reveals already done for the same ids.
    pub fn replace_messages(&mut self, mut fresh: Vec<FeedMessage>) {
        for message in &mut fresh {
            if let Some(previous) = self
                .messages
                .iter()
                .find(|existing| existing.record.id == message.record.id)
            {
                message.revealed = previous.revealed.clone();
                message.reveal_failed = previous.reveal_failed;
            }
        }
        self.messages = fresh;
    }

    pub fn push_message(&mut self, message: FeedMessage) {
        self.messages.push(message);
        self.messages.sort_by_key(|message| message.record.timestamp);
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut FeedMessage> {
        self.messages
            .iter_mut()
            .find(|message| message.record.id == message_id)
    }

    /// Show a new banner and return its generation.
    pub fn set_status(&mut self, kind: StatusKind, message: impl Into<String>) -> u64 {
        self.status_generation += 1;
        self.status = Some(TransactionStatus {
            kind,
            message: message.into(),
            generation: self.status_generation,
        });
        self.status_generation
    }

    /// Clear the banner if it is still the one from `generation`.
    pub fn dismiss_status(&mut self, generation: u64) -> bool {
        match &self.status {
            Some(status) if status.generation == generation => {
                self.status = None;
                true
            }
            _ => false,
        }
    }
}
