use std::fmt;

use crate::error::AppError;

/// Icon shown for event types outside the catalog.
pub const UNKNOWN_EVENT_ICON: &str = "🎭";

/// Catalog of event types offered when creating a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Concert,
    Conference,
    Meetup,
    Party,
    Sports,
    Art,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::Concert,
        EventType::Conference,
        EventType::Meetup,
        EventType::Party,
        EventType::Sports,
        EventType::Art,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EventType::Concert => "Concert",
            EventType::Conference => "Conference",
            EventType::Meetup => "Meetup",
            EventType::Party => "Party",
            EventType::Sports => "Sports",
            EventType::Art => "Art",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            EventType::Concert => "🎵",
            EventType::Conference => "💼",
            EventType::Meetup => "👥",
            EventType::Party => "🎉",
            EventType::Sports => "⚽",
            EventType::Art => "🎨",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Icon for a stored event type string, which may not be in the catalog.
    pub fn icon_for(name: &str) -> &'static str {
        Self::from_name(name).map_or(UNKNOWN_EVENT_ICON, |kind| kind.icon())
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A time-bounded social space as read from the contract store.
///
/// `participants` and `max_participants` are held decoded here; the stored
/// blob carries the participant counter in obfuscated form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub id: String,
    pub owner: String,
    /// Stored verbatim; older or foreign records may carry names outside
    /// [`EventType::ALL`].
    pub event_type: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub location: String,
    pub description: String,
    pub participants: u32,
    pub max_participants: u32,
}

impl EventRecord {
    pub fn is_active_at(&self, now: i64) -> bool {
        self.expires_at > now
    }

    pub fn is_full(&self) -> bool {
        self.participants >= self.max_participants
    }

    pub fn icon(&self) -> &'static str {
        EventType::icon_for(&self.event_type)
    }
}

/// A chat message inside an event. `content` is the obfuscated blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: String,
    pub sender: String,
    pub content: String,
    pub timestamp: i64,
}

/// Form data for creating a new event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub event_type: EventType,
    pub description: String,
    pub duration_hours: u32,
    pub location: String,
    pub max_participants: u32,
}

impl NewEvent {
    pub const MIN_DURATION_HOURS: u32 = 1;
    pub const MAX_DURATION_HOURS: u32 = 24;
    pub const MIN_PARTICIPANTS: u32 = 2;
    pub const MAX_PARTICIPANTS: u32 = 100;

    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            description: String::new(),
            duration_hours: 2,
            location: String::new(),
            max_participants: 50,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(Self::MIN_DURATION_HOURS..=Self::MAX_DURATION_HOURS).contains(&self.duration_hours) {
            return Err(AppError::InvalidInput(format!(
                "duration must be between {} and {} hours",
                Self::MIN_DURATION_HOURS,
                Self::MAX_DURATION_HOURS
            )));
        }
        if !(Self::MIN_PARTICIPANTS..=Self::MAX_PARTICIPANTS).contains(&self.max_participants) {
            return Err(AppError::InvalidInput(format!(
                "max participants must be between {} and {}",
                Self::MIN_PARTICIPANTS,
                Self::MAX_PARTICIPANTS
            )));
        }
        Ok(())
    }

    /// Location written to the store; blank input is stored as "Unknown".
    pub fn stored_location(&self) -> String {
        let trimmed = self.location.trim();
        if trimmed.is_empty() {
            "Unknown".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// Render a `"lat,lng"` location as coordinates; other text is returned as is.
pub fn format_location(location: &str) -> String {
    if let Some((lat, lng)) = location.split_once(',') {
        if let (Ok(lat), Ok(lng)) = (lat.trim().parse::<f64>(), lng.trim().parse::<f64>()) {
            return format!("{lat:.2}°N, {lng:.2}°E");
        }
    }
    location.to_string()
}

pub fn time_remaining(expires_at: i64, now: i64) -> String {
    let diff = expires_at - now;
    if diff <= 0 {
        return "Expired".to_string();
    }
    let hours = diff / 3600;
    let minutes = (diff % 3600) / 60;
    format!("{hours}h {minutes}m left")
}

pub fn short_address(address: &str) -> String {
    let prefix: String = address.chars().take(6).collect();
    format!("{prefix}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup_and_fallback_icon() {
        assert_eq!(EventType::from_name("Party"), Some(EventType::Party));
        assert_eq!(EventType::from_name("party"), None);
        assert_eq!(EventType::icon_for("Sports"), "⚽");
        assert_eq!(EventType::icon_for("Poetry"), UNKNOWN_EVENT_ICON);
    }

    #[test]
    fn new_event_bounds() {
        let mut draft = NewEvent::new(EventType::Meetup);
        assert!(draft.validate().is_ok());

        draft.max_participants = 1;
        assert!(matches!(draft.validate(), Err(AppError::InvalidInput(_))));

        draft.max_participants = 2;
        draft.duration_hours = 25;
        assert!(matches!(draft.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn blank_location_is_stored_as_unknown() {
        let mut draft = NewEvent::new(EventType::Art);
        draft.location = "   ".to_string();
        assert_eq!(draft.stored_location(), "Unknown");
        draft.location = " Hall B ".to_string();
        assert_eq!(draft.stored_location(), "Hall B");
    }

    #[test]
    fn formats_coordinates() {
        assert_eq!(format_location("52.5200,13.4070"), "52.52°N, 13.41°E");
        assert_eq!(format_location("Main square"), "Main square");
        assert_eq!(format_location("Hall, 2nd floor"), "Hall, 2nd floor");
    }

    #[test]
    fn remaining_time_display() {
        assert_eq!(time_remaining(100, 100), "Expired");
        assert_eq!(time_remaining(100 + 2 * 3600 + 5 * 60 + 30, 100), "2h 5m left");
    }

    #[test]
    fn shortens_addresses() {
        assert_eq!(short_address("0xabcdef123456"), "0xabcd...");
    }
}
