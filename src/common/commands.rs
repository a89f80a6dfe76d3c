use super::types::NewEvent;

/// Lệnh từ UI gửi xuống session service.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Reload the active event list
    Browse,
    CreateEvent(NewEvent),
    /// Take a seat in an event and open it
    Join(String),
    /// Open an event without taking a seat
    Open(String),
    Send(String),
    /// Request the plain text of another participant's message
    Reveal(String),
    Leave,
    Shutdown,
}
