//! Event and message directory kept inside the contract's key/value store.
//!
//! The store has no listing primitive, so ids are kept in JSON array blobs
//! (`event_keys`, `messages_{eventId}_keys`) and each record lives under its
//! own key. Reads walk the id list and fetch every record; a record that is
//! missing or unreadable is logged and skipped.
//!
//! Appending to an id list and bumping a participant counter are plain
//! read-modify-write sequences against shared state. Two writers racing on
//! the same list or event can lose an append or an increment.

use std::sync::Arc;

use chrono::Utc;

use crate::codec::{self, obfuscate_text};
use crate::common::{EventRecord, MessageRecord, NewEvent};
use crate::error::AppError;
use crate::storage::ContractStore;
use crate::storage::keys::{EVENT_KEYS, event_key, message_key, message_keys_key};
use crate::wallet::{Wallet, transaction_message};

const EVENT_SUFFIX_LEN: usize = 7;
const MESSAGE_SUFFIX_LEN: usize = 4;

#[derive(Clone)]
pub struct DirectoryIndex {
    store: Arc<dyn ContractStore>,
    wallet: Arc<dyn Wallet>,
}

impl DirectoryIndex {
    pub fn new(store: Arc<dyn ContractStore>, wallet: Arc<dyn Wallet>) -> Self {
        Self { store, wallet }
    }

    pub fn store(&self) -> &Arc<dyn ContractStore> {
        &self.store
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    /// Active events, newest first.
    pub async fn list_active_events(&self) -> Result<Vec<EventRecord>, AppError> {
        self.list_active_events_at(Utc::now().timestamp()).await
    }

    /// Events whose expiration is after `now` (unix seconds), newest first.
    pub async fn list_active_events_at(&self, now: i64) -> Result<Vec<EventRecord>, AppError> {
        self.ensure_available().await?;

        let ids = self.read_keys_tolerant(EVENT_KEYS).await?;
        let mut events = Vec::with_capacity(ids.len());
        for id in ids {
            let key = event_key(&id);
            let Some(bytes) = self.fetch_record_blob(&key).await else {
                continue;
            };
            match codec::decode_event(&id, &bytes) {
                Ok(event) if event.is_active_at(now) => events.push(event),
                Ok(_) => {}
                Err(err) => log::warn!("Skipping event record {key}: {err}"),
            }
        }

        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    /// Read a single event record.
    pub async fn get_event(&self, event_id: &str) -> Result<EventRecord, AppError> {
        let bytes = self.store.get_data(&event_key(event_id)).await?;
        if bytes.is_empty() {
            return Err(AppError::EventNotFound(event_id.to_string()));
        }
        Ok(codec::decode_event(event_id, &bytes)?)
    }

    /// Write a new event and register its id. The participant counter
    /// starts at zero; the creator joins like anybody else.
    pub async fn create_event(&self, draft: &NewEvent) -> Result<String, AppError> {
        draft.validate()?;
        let owner = self.signer_address()?;

        let now = Utc::now();
        let id = generate_id(now.timestamp_millis(), EVENT_SUFFIX_LEN);
        let created_at = now.timestamp();
        let record = EventRecord {
            id: id.clone(),
            owner,
            event_type: draft.event_type.name().to_string(),
            created_at,
            expires_at: created_at + i64::from(draft.duration_hours) * 3600,
            location: draft.stored_location(),
            description: draft.description.clone(),
            participants: 0,
            max_participants: draft.max_participants,
        };

        let blob = codec::encode_event(&record)?;
        self.write(&event_key(&id), &blob).await?;
        self.append_key(EVENT_KEYS, &id).await?;

        log::info!("Created event {id} ({})", record.event_type);
        Ok(id)
    }

    /// Take one seat in an event. Fails without writing when the event is
    /// already at capacity.
    pub async fn join_event(&self, event_id: &str) -> Result<EventRecord, AppError> {
        let mut event = self.get_event(event_id).await?;
        if event.is_full() {
            return Err(AppError::EventFull {
                event_id: event_id.to_string(),
                max: event.max_participants,
            });
        }

        event.participants += 1;
        let blob = codec::encode_event(&event)?;
        self.write(&event_key(event_id), &blob).await?;

        log::info!(
            "Joined event {event_id} ({}/{})",
            event.participants,
            event.max_participants
        );
        Ok(event)
    }

    /// Messages of an event, oldest first. Messages sharing a timestamp keep
    /// the order of the id list.
    pub async fn list_messages(&self, event_id: &str) -> Result<Vec<MessageRecord>, AppError> {
        let ids = self.read_keys_tolerant(&message_keys_key(event_id)).await?;
        let mut messages = Vec::with_capacity(ids.len());
        for id in ids {
            let key = message_key(event_id, &id);
            let Some(bytes) = self.fetch_record_blob(&key).await else {
                continue;
            };
            match codec::decode_message(&id, &bytes) {
                Ok(message) => messages.push(message),
                Err(err) => log::warn!("Skipping message record {key}: {err}"),
            }
        }

        messages.sort_by_key(|message| message.timestamp);
        Ok(messages)
    }

    /// Store a message and append its id to the event's message list.
    pub async fn post_message(
        &self,
        event_id: &str,
        sender: &str,
        plain_text: &str,
    ) -> Result<MessageRecord, AppError> {
        let now = Utc::now();
        let record = MessageRecord {
            id: generate_id(now.timestamp_millis(), MESSAGE_SUFFIX_LEN),
            sender: sender.to_string(),
            content: obfuscate_text(plain_text),
            timestamp: now.timestamp(),
        };

        let blob = codec::encode_message(&record)?;
        self.write(&message_key(event_id, &record.id), &blob).await?;
        self.append_key(&message_keys_key(event_id), &record.id).await?;

        log::info!("Posted message {} to event {event_id}", record.id);
        Ok(record)
    }

    async fn ensure_available(&self) -> Result<(), AppError> {
        if self.store.is_available().await? {
            Ok(())
        } else {
            Err(AppError::StoreUnavailable)
        }
    }

    fn signer_address(&self) -> Result<String, AppError> {
        self.wallet
            .address()
            .ok_or_else(|| AppError::Unknown("Please connect wallet first".to_string()))
    }

    /// Sign and send a `set_data` transaction.
    async fn write(&self, key: &str, value: &[u8]) -> Result<(), AppError> {
        let from = self.signer_address()?;
        self.wallet
            .sign_message(&transaction_message(key, value))
            .await?;
        let receipt = self.store.set_data(key, value, &from).await?;
        log::debug!("set_data {key} accepted in {}", receipt.tx_hash);
        Ok(())
    }

    /// Id list for reading: an unreadable list is logged and treated as empty.
    async fn read_keys_tolerant(&self, key: &str) -> Result<Vec<String>, AppError> {
        let bytes = self.store.get_data(key).await?;
        match codec::decode_keys(&bytes) {
            Ok(ids) => Ok(ids),
            Err(err) => {
                log::error!("Error parsing id list {key}: {err}");
                Ok(Vec::new())
            }
        }
    }

    /// Read-modify-write append. An unreadable list aborts the append so the
    /// existing ids are not overwritten.
    async fn append_key(&self, list_key: &str, id: &str) -> Result<(), AppError> {
        let bytes = self.store.get_data(list_key).await?;
        let mut ids = codec::decode_keys(&bytes)?;
        ids.push(id.to_string());
        let blob = codec::encode_keys(&ids)?;
        self.write(list_key, &blob).await
    }

    /// Blob for one record of a batch; `None` when it is missing or the read
    /// fails, so the batch can move on.
    async fn fetch_record_blob(&self, key: &str) -> Option<Vec<u8>> {
        match self.store.get_data(key).await {
            Ok(bytes) if bytes.is_empty() => {
                log::warn!("Listed record {key} has no data");
                None
            }
            Ok(bytes) => Some(bytes),
            Err(err) => {
                log::warn!("Error loading record {key}: {err}");
                None
            }
        }
    }
}

/// `{millis}-{suffix}` with a random base-36 suffix. Uniqueness is not
/// checked.
pub fn generate_id(millis: i64, suffix_len: usize) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let suffix: String = (0..suffix_len)
        .map(|_| ALPHABET[rand::random_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{millis}-{suffix}")
}
