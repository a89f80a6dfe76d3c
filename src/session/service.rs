use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::common::{SessionCommand, SessionUpdate};
use crate::error::AppError;

use super::manager::SessionManager;

/// Drives a [`SessionManager`] from a command channel and publishes what
/// changed on an update channel. While an event is open its feed is polled
/// every `message_poll`.
pub struct SessionService {
    manager: SessionManager,
    command_receiver: mpsc::Receiver<SessionCommand>,
    update_sender: mpsc::Sender<SessionUpdate>,
}

impl SessionService {
    pub fn new(
        manager: SessionManager,
        command_receiver: mpsc::Receiver<SessionCommand>,
        update_sender: mpsc::Sender<SessionUpdate>,
    ) -> Self {
        Self {
            manager,
            command_receiver,
            update_sender,
        }
    }

    pub async fn run(mut self) -> SessionManager {
        let mut poll = time::interval(self.manager.settings().message_poll);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if let Err(err) = self.manager.browse().await {
            log::warn!("Initial event load failed: {err}");
        }
        self.flush().await;
        log::info!("Session service started");

        loop {
            tokio::select! {
                command = self.command_receiver.recv() => {
                    match command {
                        Some(SessionCommand::Shutdown) | None => break,
                        Some(command) => self.handle_command(command).await,
                    }
                }
                event = self.manager.next_event() => {
                    if let Some(event) = event {
                        self.manager.apply(event);
                    }
                }
                _ = poll.tick() => {
                    if let Err(err) = self.manager.refresh_messages().await {
                        log::warn!("Message poll failed: {err}");
                    }
                }
            }
            self.flush().await;
        }

        self.manager.leave();
        log::info!("Session service stopped");
        self.manager
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        let result: Result<(), AppError> = match command {
            SessionCommand::Browse => self.manager.browse().await.map(|_| ()),
            SessionCommand::CreateEvent(draft) => {
                self.manager.create_event(&draft).await.map(|_| ())
            }
            SessionCommand::Join(id) => self.manager.join(&id).await.map(|_| ()),
            SessionCommand::Open(id) => self.manager.open(&id).await.map(|_| ()),
            SessionCommand::Send(text) => self.manager.send(&text).await.map(|_| ()),
            SessionCommand::Reveal(id) => self.manager.reveal(&id),
            SessionCommand::Leave => {
                self.manager.leave();
                Ok(())
            }
            SessionCommand::Shutdown => Ok(()),
        };
        if let Err(err) = result {
            log::warn!("Command failed: {err}");
        }
    }

    async fn flush(&mut self) {
        for update in self.manager.take_updates() {
            if let Err(err) = self.update_sender.send(update).await {
                log::warn!("Failed to notify UI: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::common::{EventType, NewEvent};
    use crate::directory::DirectoryIndex;
    use crate::session::manager::SessionSettings;
    use crate::session::state::SessionMode;
    use crate::storage::MemoryStore;
    use crate::wallet::LocalWallet;

    #[tokio::test(start_paused = true)]
    async fn commands_drive_the_session() {
        let store = Arc::new(MemoryStore::default());
        let directory = DirectoryIndex::new(store, Arc::new(LocalWallet::new("0xA11CE")));
        let manager = SessionManager::new(directory.clone(), SessionSettings::default());

        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (update_tx, mut update_rx) = mpsc::channel(256);
        let service = tokio::spawn(SessionService::new(manager, cmd_rx, update_tx).run());

        cmd_tx
            .send(SessionCommand::CreateEvent(NewEvent::new(EventType::Concert)))
            .await
            .unwrap();

        let event_id = loop {
            match update_rx.recv().await {
                Some(SessionUpdate::EventsLoaded(events)) if !events.is_empty() => {
                    break events[0].id.clone();
                }
                Some(_) => continue,
                None => panic!("service stopped early"),
            }
        };

        cmd_tx.send(SessionCommand::Join(event_id.clone())).await.unwrap();
        cmd_tx.send(SessionCommand::Send("hi".into())).await.unwrap();

        loop {
            match update_rx.recv().await {
                Some(SessionUpdate::MessagePosted(record)) => {
                    assert_eq!(record.sender, "0xA11CE");
                    break;
                }
                Some(_) => continue,
                None => panic!("service stopped early"),
            }
        }

        tokio::time::sleep(Duration::from_millis(5500)).await;
        cmd_tx.send(SessionCommand::Shutdown).await.unwrap();
        let manager = service.await.unwrap();
        assert_eq!(manager.state().mode, SessionMode::Browsing);

        let messages = directory.list_messages(&event_id).await.unwrap();
        assert_eq!(messages.len(), 1);
    }
}
