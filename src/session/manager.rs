use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec::reveal_text;
use crate::common::{EventRecord, MessageRecord, NewEvent, SessionEvent, SessionUpdate};
use crate::config::AppConfig;
use crate::directory::DirectoryIndex;
use crate::error::AppError;
use crate::wallet::{DecryptChallenge, Wallet};

use super::refresher::spawn_participant_refresher;
use super::state::{AppState, FeedMessage, StatusKind};

/// Timings used by a session. Intervals are at least one millisecond.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub chain_id: u64,
    pub participant_refresh: Duration,
    pub message_poll: Duration,
    pub decrypt_delay: Duration,
    pub success_dismiss: Duration,
    pub error_dismiss: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            chain_id: config.chain_id,
            participant_refresh: Duration::from_millis(config.participant_refresh_ms.max(1)),
            message_poll: Duration::from_millis(config.message_poll_ms.max(1)),
            decrypt_delay: Duration::from_millis(config.decrypt_delay_ms),
            success_dismiss: Duration::from_millis(config.success_dismiss_ms),
            error_dismiss: Duration::from_millis(config.error_dismiss_ms),
        }
    }
}

/// Owns the session state: which event is open, its feed, and the
/// background tasks tied to it.
///
/// Background tasks never touch the state directly. They report through a
/// channel, and [`SessionManager::pump`] (or the service loop) applies what
/// they send. Changes meant for a UI are queued and drained with
/// [`SessionManager::take_updates`].
pub struct SessionManager {
    directory: DirectoryIndex,
    settings: SessionSettings,
    challenge: DecryptChallenge,
    state: AppState,
    event_tx: mpsc::Sender<SessionEvent>,
    event_rx: mpsc::Receiver<SessionEvent>,
    refresher: Option<JoinHandle<()>>,
    reveals: HashMap<String, JoinHandle<()>>,
    updates: Vec<SessionUpdate>,
}

impl SessionManager {
    pub fn new(directory: DirectoryIndex, settings: SessionSettings) -> Self {
        let (event_tx, event_rx) = mpsc::channel(100);
        let challenge = DecryptChallenge::new(directory.store().address(), settings.chain_id);
        Self {
            directory,
            settings,
            challenge,
            state: AppState::new(),
            event_tx,
            event_rx,
            refresher: None,
            reveals: HashMap::new(),
            updates: Vec::new(),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn directory(&self) -> &DirectoryIndex {
        &self.directory
    }

    pub fn take_updates(&mut self) -> Vec<SessionUpdate> {
        mem::take(&mut self.updates)
    }

    fn wallet(&self) -> &Arc<dyn Wallet> {
        self.directory.wallet()
    }

    /// Reload the list of active events. An unavailable store leaves the
    /// list empty.
    pub async fn browse(&mut self) -> Result<&[EventRecord], AppError> {
        match self.directory.list_active_events().await {
            Ok(events) => {
                self.state.events = events;
                self.updates
                    .push(SessionUpdate::EventsLoaded(self.state.events.clone()));
                Ok(&self.state.events)
            }
            Err(err) => {
                log::error!("Error loading events: {err}");
                self.state.events.clear();
                self.updates.push(SessionUpdate::EventsLoaded(Vec::new()));
                Err(err)
            }
        }
    }

    pub async fn create_event(&mut self, draft: &NewEvent) -> Result<String, AppError> {
        self.set_status(
            StatusKind::Pending,
            "Creating encrypted social space...",
            None,
        );

        match self.directory.create_event(draft).await {
            Ok(id) => {
                let dismiss = self.settings.success_dismiss;
                self.set_status(
                    StatusKind::Success,
                    "Ephemeral social space created!",
                    Some(dismiss),
                );
                self.browse_quietly().await;
                Ok(id)
            }
            Err(err) => {
                log::warn!("Event creation failed: {err}");
                let dismiss = self.settings.error_dismiss;
                let message = err.user_message("Creation failed");
                self.set_status(StatusKind::Error, message, Some(dismiss));
                Err(err)
            }
        }
    }

    /// Take a seat in `event_id`, then open it.
    pub async fn join(&mut self, event_id: &str) -> Result<EventRecord, AppError> {
        self.set_status(StatusKind::Pending, "Joining with FHE encryption...", None);

        let event = match self.directory.join_event(event_id).await {
            Ok(event) => event,
            Err(err) => {
                log::warn!("Join of {event_id} failed: {err}");
                let dismiss = self.settings.error_dismiss;
                let message = err.user_message("Join failed");
                self.set_status(StatusKind::Error, message, Some(dismiss));
                return Err(err);
            }
        };

        let dismiss = self.settings.success_dismiss;
        self.set_status(StatusKind::Success, "Joined event securely!", Some(dismiss));
        self.browse_quietly().await;
        self.enter(event.clone()).await;
        Ok(event)
    }

    /// Open an event without taking a seat.
    pub async fn open(&mut self, event_id: &str) -> Result<EventRecord, AppError> {
        let cached = self
            .state
            .events
            .iter()
            .find(|event| event.id == event_id)
            .cloned();
        let event = match cached {
            Some(event) => event,
            None => self.directory.get_event(event_id).await?,
        };
        self.enter(event.clone()).await;
        Ok(event)
    }

    /// Back to the event list. Stops the refresher and pending reveals.
    pub fn leave(&mut self) {
        self.stop_background_tasks();
        if self.state.active_event_id().is_some() {
            self.state.leave_event();
            self.updates.push(SessionUpdate::Left);
        }
    }

    /// Reload the feed of the open event. Does nothing while browsing.
    pub async fn refresh_messages(&mut self) -> Result<(), AppError> {
        let Some(event_id) = self.state.active_event_id().map(str::to_owned) else {
            return Ok(());
        };
        let own = self.wallet().address();
        let records = self.directory.list_messages(&event_id).await?;
        let feed = records
            .into_iter()
            .map(|record| FeedMessage::new(record, own.as_deref()))
            .collect();
        self.state.replace_messages(feed);
        self.updates
            .push(SessionUpdate::MessagesLoaded(self.state.messages.clone()));
        Ok(())
    }

    /// Post `text` to the open event. Blank text is ignored.
    pub async fn send(&mut self, text: &str) -> Result<Option<MessageRecord>, AppError> {
        let Some(event_id) = self.state.active_event_id().map(str::to_owned) else {
            return Err(AppError::InvalidInput("no event is open".to_string()));
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        let Some(sender) = self.wallet().address() else {
            return Err(AppError::Unknown("Please connect wallet first".to_string()));
        };

        match self.directory.post_message(&event_id, &sender, text).await {
            Ok(record) => {
                self.state
                    .push_message(FeedMessage::new(record.clone(), Some(&sender)));
                self.updates.push(SessionUpdate::MessagePosted(record.clone()));
                Ok(Some(record))
            }
            Err(err) => {
                log::error!("Error sending message: {err}");
                let dismiss = self.settings.error_dismiss;
                self.set_status(StatusKind::Error, "Failed to send message", Some(dismiss));
                Err(err)
            }
        }
    }

    /// Start revealing another participant's message. The plain text shows
    /// up once the wallet signs the challenge and the reveal delay passes.
    /// Only one reveal runs at a time; requests made meanwhile are ignored.
    pub fn reveal(&mut self, message_id: &str) -> Result<(), AppError> {
        let Some(event_id) = self.state.active_event_id().map(str::to_owned) else {
            return Err(AppError::InvalidInput("no event is open".to_string()));
        };
        if self.wallet().address().is_none() {
            return Err(AppError::Unknown("Please connect wallet first".to_string()));
        }
        let Some(message) = self
            .state
            .messages
            .iter()
            .find(|message| message.record.id == message_id)
        else {
            return Err(AppError::InvalidInput(format!("unknown message {message_id}")));
        };
        if !message.needs_reveal() || self.state.decrypting {
            return Ok(());
        }

        let content = message.record.content.clone();
        let wallet = Arc::clone(self.wallet());
        let prompt = self.challenge.message();
        let delay = self.settings.decrypt_delay;
        let events = self.event_tx.clone();
        let message_id = message_id.to_string();
        self.state.decrypting = true;

        let task_message_id = message_id.clone();
        let handle = tokio::spawn(async move {
            let outcome = match wallet.sign_message(&prompt).await {
                Ok(_) => {
                    tokio::time::sleep(delay).await;
                    let text = reveal_text(&content).unwrap_or(content);
                    SessionEvent::MessageRevealed {
                        event_id,
                        message_id: task_message_id,
                        text,
                    }
                }
                Err(err) => {
                    log::warn!("Decryption failed: {err}");
                    SessionEvent::RevealFailed {
                        event_id,
                        message_id: task_message_id,
                    }
                }
            };
            let _ = events.send(outcome).await;
        });
        self.reveals.insert(message_id, handle);
        Ok(())
    }

    /// Apply everything background tasks have reported so far.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// Wait for the next report from a background task.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ParticipantTick { event_id, count } => {
                if self.state.active_event_id() == Some(event_id.as_str()) {
                    self.state.participant_count = count;
                    self.updates.push(SessionUpdate::ParticipantCount(count));
                }
            }
            SessionEvent::MessageRevealed {
                event_id,
                message_id,
                text,
            } => {
                self.reveals.remove(&message_id);
                if self.state.active_event_id() != Some(event_id.as_str()) {
                    return;
                }
                self.state.decrypting = false;
                if let Some(message) = self.state.message_mut(&message_id) {
                    message.revealed = Some(text.clone());
                    message.reveal_failed = false;
                    self.updates
                        .push(SessionUpdate::MessageRevealed { message_id, text });
                }
            }
            SessionEvent::RevealFailed {
                event_id,
                message_id,
            } => {
                self.reveals.remove(&message_id);
                if self.state.active_event_id() != Some(event_id.as_str()) {
                    return;
                }
                self.state.decrypting = false;
                if let Some(message) = self.state.message_mut(&message_id) {
                    message.reveal_failed = true;
                    self.updates.push(SessionUpdate::RevealFailed { message_id });
                }
            }
            SessionEvent::StatusExpired(generation) => {
                if self.state.dismiss_status(generation) {
                    log::debug!("Transaction status {generation} dismissed");
                    self.updates.push(SessionUpdate::Status(None));
                }
            }
        }
    }

    async fn enter(&mut self, event: EventRecord) {
        self.stop_background_tasks();
        let start = event.participants.max(1).min(event.max_participants.max(1));
        self.refresher = Some(spawn_participant_refresher(
            event.id.clone(),
            start,
            event.max_participants,
            self.settings.participant_refresh,
            self.event_tx.clone(),
        ));
        self.state.enter_event(event.clone(), start);
        self.updates.push(SessionUpdate::EventOpened(event));

        if let Err(err) = self.refresh_messages().await {
            log::error!("Error loading messages: {err}");
        }
    }

    async fn browse_quietly(&mut self) {
        // failures are already logged by browse
        let _ = self.browse().await;
    }

    fn set_status(
        &mut self,
        kind: StatusKind,
        message: impl Into<String>,
        dismiss_after: Option<Duration>,
    ) {
        let generation = self.state.set_status(kind, message);
        self.updates
            .push(SessionUpdate::Status(self.state.status.clone()));

        if let Some(delay) = dismiss_after {
            let events = self.event_tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.send(SessionEvent::StatusExpired(generation)).await;
            });
        }
    }

    fn stop_background_tasks(&mut self) {
        if let Some(handle) = self.refresher.take() {
            handle.abort();
        }
        for (_, handle) in self.reveals.drain() {
            handle.abort();
        }
        self.state.decrypting = false;
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop_background_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EventType;
    use crate::session::state::{OPAQUE_PLACEHOLDER, SessionMode};
    use crate::storage::MemoryStore;
    use crate::wallet::LocalWallet;

    struct Fixture {
        store: Arc<MemoryStore>,
        alice: Arc<LocalWallet>,
        bob: DirectoryIndex,
        session: SessionManager,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let alice = Arc::new(LocalWallet::new("0xA11CE"));
        let bob = DirectoryIndex::new(store.clone(), Arc::new(LocalWallet::new("0xB0B")));
        let session = SessionManager::new(
            DirectoryIndex::new(store.clone(), alice.clone()),
            SessionSettings::default(),
        );
        Fixture {
            store,
            alice,
            bob,
            session,
        }
    }

    fn draft(max: u32) -> NewEvent {
        let mut draft = NewEvent::new(EventType::Meetup);
        draft.max_participants = max;
        draft
    }

    #[tokio::test(start_paused = true)]
    async fn join_opens_event_with_messages() {
        let mut f = fixture();
        let id = f.bob.create_event(&draft(5)).await.unwrap();
        f.bob.post_message(&id, "0xB0B", "welcome").await.unwrap();

        let event = f.session.join(&id).await.unwrap();
        assert_eq!(event.participants, 1);

        let state = f.session.state();
        assert_eq!(state.mode, SessionMode::Joined(id.clone()));
        assert_eq!(state.participant_count, 1);
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].display_text(), OPAQUE_PLACEHOLDER);
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.status.as_ref().unwrap().kind, StatusKind::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn full_event_reports_error_and_stays_browsing() {
        let mut f = fixture();
        let id = f.bob.create_event(&draft(2)).await.unwrap();
        f.bob.join_event(&id).await.unwrap();
        f.bob.join_event(&id).await.unwrap();

        let err = f.session.join(&id).await.unwrap_err();
        assert!(matches!(err, AppError::EventFull { .. }));
        let state = f.session.state();
        assert_eq!(state.mode, SessionMode::Browsing);
        let status = state.status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.message, "Event is full");
    }

    #[tokio::test(start_paused = true)]
    async fn status_is_dismissed_after_delay() {
        let mut f = fixture();
        f.session.create_event(&draft(4)).await.unwrap();
        assert!(f.session.state().status.is_some());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        f.session.pump();
        assert!(f.session.state().status.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn send_ignores_blank_and_requires_open_event() {
        let mut f = fixture();
        assert!(matches!(
            f.session.send("hi").await,
            Err(AppError::InvalidInput(_))
        ));

        let id = f.bob.create_event(&draft(4)).await.unwrap();
        f.session.open(&id).await.unwrap();
        let writes = f.store.write_count();
        assert!(f.session.send("   ").await.unwrap().is_none());
        assert_eq!(f.store.write_count(), writes);

        let sent = f.session.send("hello all").await.unwrap().unwrap();
        let feed = &f.session.state().messages;
        assert_eq!(feed.last().unwrap().record, sent);
        assert_eq!(feed.last().unwrap().display_text(), "hello all");
    }

    #[tokio::test(start_paused = true)]
    async fn reveal_needs_signature_and_delay() {
        let mut f = fixture();
        let id = f.bob.create_event(&draft(4)).await.unwrap();
        let posted = f.bob.post_message(&id, "0xB0B", "secret plan").await.unwrap();
        f.session.open(&id).await.unwrap();

        f.session.reveal(&posted.id).unwrap();
        assert!(f.session.state().decrypting);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        f.session.pump();
        assert_eq!(f.session.state().messages[0].revealed, None);

        tokio::time::sleep(Duration::from_millis(600)).await;
        f.session.pump();
        let message = &f.session.state().messages[0];
        assert_eq!(message.display_text(), "secret plan");
        assert!(!f.session.state().decrypting);
    }

    #[tokio::test(start_paused = true)]
    async fn declined_signature_keeps_message_opaque() {
        let mut f = fixture();
        let id = f.bob.create_event(&draft(4)).await.unwrap();
        let posted = f.bob.post_message(&id, "0xB0B", "secret plan").await.unwrap();
        f.session.open(&id).await.unwrap();
        f.alice.set_approve(false);

        f.session.reveal(&posted.id).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        f.session.pump();

        let message = &f.session.state().messages[0];
        assert_eq!(message.revealed, None);
        assert!(message.reveal_failed);
        assert!(!f.session.state().decrypting);
    }

    #[tokio::test(start_paused = true)]
    async fn refresher_moves_count_and_stops_on_leave() {
        let mut f = fixture();
        let id = f.bob.create_event(&draft(3)).await.unwrap();
        f.session.join(&id).await.unwrap();

        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(3000)).await;
            f.session.pump();
            assert!((1..=3).contains(&f.session.state().participant_count));
        }

        f.session.leave();
        assert_eq!(f.session.state().mode, SessionMode::Browsing);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        f.session.pump();
        assert_eq!(f.session.state().participant_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn opening_unjoined_event_shows_at_least_one() {
        let mut f = fixture();
        let id = f.bob.create_event(&draft(4)).await.unwrap();

        let event = f.session.open(&id).await.unwrap();
        assert_eq!(event.participants, 0);
        assert_eq!(f.session.state().participant_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn leave_cancels_pending_reveal() {
        let mut f = fixture();
        let id = f.bob.create_event(&draft(4)).await.unwrap();
        let posted = f.bob.post_message(&id, "0xB0B", "later").await.unwrap();
        f.session.open(&id).await.unwrap();

        f.session.reveal(&posted.id).unwrap();
        f.session.leave();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        f.session.pump();

        f.session.open(&id).await.unwrap();
        assert_eq!(f.session.state().messages[0].revealed, None);
    }

    #[tokio::test]
    async fn unavailable_store_shows_no_events() {
        let mut f = fixture();
        f.bob.create_event(&draft(4)).await.unwrap();
        f.session.browse().await.unwrap();
        assert_eq!(f.session.state().events.len(), 1);

        f.store.set_available(false);
        assert!(matches!(
            f.session.browse().await,
            Err(AppError::StoreUnavailable)
        ));
        assert!(f.session.state().events.is_empty());
    }
}
