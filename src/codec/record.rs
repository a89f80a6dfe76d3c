//! JSON blobs for event and message records.
//!
//! Field names follow the layout already present in deployed stores:
//! `event_{id}` holds `{participants, timestamp, owner, eventType,
//! expiration, location, description}` plus `maxParticipants`, and
//! `message_{eventId}_{messageId}` holds `{content, sender, timestamp}`.
//! Record ids live in the key, not in the blob.
//!
//! Event blobs written without `maxParticipants` decode with
//! [`DEFAULT_MAX_PARTICIPANTS`] as their cap.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::common::{EventRecord, MessageRecord, NewEvent};

use super::DecodeError;
use super::obfuscate::{deobfuscate_count, obfuscate_count};

/// Cap for event blobs that carry no `maxParticipants` field.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = NewEvent::MAX_PARTICIPANTS;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventBlob {
    participants: Option<String>,
    timestamp: Option<i64>,
    owner: Option<String>,
    event_type: Option<String>,
    expiration: Option<i64>,
    location: Option<String>,
    #[serde(default)]
    description: String,
    max_participants: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MessageBlob {
    content: Option<String>,
    sender: Option<String>,
    timestamp: Option<i64>,
}

pub fn encode_event(record: &EventRecord) -> Result<Vec<u8>, DecodeError> {
    let blob = EventBlob {
        participants: Some(obfuscate_count(record.participants)),
        timestamp: Some(record.created_at),
        owner: Some(record.owner.clone()),
        event_type: Some(record.event_type.clone()),
        expiration: Some(record.expires_at),
        location: Some(record.location.clone()),
        description: record.description.clone(),
        max_participants: Some(record.max_participants),
    };
    Ok(serde_json::to_vec(&blob)?)
}

pub fn decode_event(id: &str, bytes: &[u8]) -> Result<EventRecord, DecodeError> {
    let blob: EventBlob = parse(bytes)?;
    let participants = required(blob.participants, "participants")?;
    Ok(EventRecord {
        id: id.to_string(),
        participants: deobfuscate_count(&participants)?,
        created_at: required(blob.timestamp, "timestamp")?,
        owner: required(blob.owner, "owner")?,
        event_type: required(blob.event_type, "eventType")?,
        expires_at: required(blob.expiration, "expiration")?,
        location: required(blob.location, "location")?,
        description: blob.description,
        max_participants: blob
            .max_participants
            .unwrap_or(DEFAULT_MAX_PARTICIPANTS),
    })
}

pub fn encode_message(record: &MessageRecord) -> Result<Vec<u8>, DecodeError> {
    let blob = MessageBlob {
        content: Some(record.content.clone()),
        sender: Some(record.sender.clone()),
        timestamp: Some(record.timestamp),
    };
    Ok(serde_json::to_vec(&blob)?)
}

pub fn decode_message(id: &str, bytes: &[u8]) -> Result<MessageRecord, DecodeError> {
    let blob: MessageBlob = parse(bytes)?;
    Ok(MessageRecord {
        id: id.to_string(),
        content: required(blob.content, "content")?,
        sender: required(blob.sender, "sender")?,
        timestamp: required(blob.timestamp, "timestamp")?,
    })
}

/// Encode an id list blob (`event_keys`, `messages_{eventId}_keys`).
pub fn encode_keys(keys: &[String]) -> Result<Vec<u8>, DecodeError> {
    Ok(serde_json::to_vec(keys)?)
}

/// Decode an id list blob. Empty or whitespace-only blobs are an empty list.
pub fn decode_keys(bytes: &[u8]) -> Result<Vec<String>, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(text)?)
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::Utf8)?;
    Ok(serde_json::from_str(text)?)
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, DecodeError> {
    value.ok_or(DecodeError::MissingField(field))
}
