use std::sync::Arc;

use ephemeral_spaces::codec::{
    self, DEFAULT_MAX_PARTICIPANTS, deobfuscate_number, obfuscate_number, reveal_text,
};
use ephemeral_spaces::common::{EventType, NewEvent};
use ephemeral_spaces::storage::keys::{EVENT_KEYS, event_key, message_keys_key};
use ephemeral_spaces::{
    AppError, ContractDatabase, ContractStore, DirectoryIndex, LocalWallet, MemoryStore,
};

fn sqlite_store(dir: &tempfile::TempDir) -> Arc<ContractDatabase> {
    let path = dir.path().join("data/contract.db");
    Arc::new(ContractDatabase::open(&path, "0xC0FFEE").unwrap())
}

fn meetup(max: u32) -> NewEvent {
    let mut draft = NewEvent::new(EventType::Meetup);
    draft.max_participants = max;
    draft.location = "48.8566,2.3522".to_string();
    draft.description = "Coffee after the talks".to_string();
    draft
}

#[test]
fn obfuscation_scenarios() {
    assert_eq!(deobfuscate_number(&obfuscate_number(42.0)).unwrap(), 42.0);
    assert_eq!(deobfuscate_number("42").unwrap(), 42.0);
}

#[tokio::test]
async fn capacity_two_admits_two_joins() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir);
    let directory = DirectoryIndex::new(store.clone(), Arc::new(LocalWallet::new("0xA11CE")));

    let id = directory.create_event(&meetup(2)).await.unwrap();
    assert_eq!(directory.join_event(&id).await.unwrap().participants, 1);
    assert_eq!(directory.join_event(&id).await.unwrap().participants, 2);

    let before = store.get_data(&event_key(&id)).await.unwrap();
    let err = directory.join_event(&id).await.unwrap_err();
    assert!(matches!(err, AppError::EventFull { max: 2, .. }));
    assert_eq!(store.get_data(&event_key(&id)).await.unwrap(), before);
}

#[tokio::test]
async fn two_clients_share_one_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir);
    let alice = DirectoryIndex::new(store.clone(), Arc::new(LocalWallet::new("0xA11CE")));
    let bob = DirectoryIndex::new(store.clone(), Arc::new(LocalWallet::new("0xB0B")));

    let first = alice.create_event(&meetup(10)).await.unwrap();
    let second = bob
        .create_event(&NewEvent::new(EventType::Concert))
        .await
        .unwrap();

    let keys = codec::decode_keys(&store.get_data(EVENT_KEYS).await.unwrap()).unwrap();
    assert_eq!(keys, vec![first.clone(), second.clone()]);

    let listed = alice.list_active_events().await.unwrap();
    assert_eq!(listed.len(), 2);
    let owners: Vec<_> = listed.iter().map(|event| event.owner.as_str()).collect();
    assert!(owners.contains(&"0xA11CE") && owners.contains(&"0xB0B"));

    alice.post_message(&first, "0xA11CE", "anyone here?").await.unwrap();
    bob.post_message(&first, "0xB0B", "on my way").await.unwrap();

    let feed = bob.list_messages(&first).await.unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(reveal_text(&feed[0].content).unwrap(), "anyone here?");
    assert_eq!(reveal_text(&feed[1].content).unwrap(), "on my way");
    assert!(feed[0].timestamp <= feed[1].timestamp);

    let message_keys =
        codec::decode_keys(&store.get_data(&message_keys_key(&first)).await.unwrap()).unwrap();
    assert_eq!(message_keys.len(), 2);
}

#[tokio::test]
async fn directory_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = {
        let directory =
            DirectoryIndex::new(sqlite_store(&dir), Arc::new(LocalWallet::new("0xA11CE")));
        directory.create_event(&meetup(5)).await.unwrap()
    };

    let directory = DirectoryIndex::new(sqlite_store(&dir), Arc::new(LocalWallet::new("0xB0B")));
    let event = directory.get_event(&id).await.unwrap();
    assert_eq!(event.description, "Coffee after the talks");
    assert_eq!(event.location, "48.8566,2.3522");
}

#[tokio::test]
async fn one_corrupt_record_among_many() {
    let store = Arc::new(MemoryStore::default());
    let directory = DirectoryIndex::new(store.clone(), Arc::new(LocalWallet::new("0xA11CE")));
    let mut ids = Vec::new();
    for _ in 0..4 {
        ids.push(directory.create_event(&meetup(5)).await.unwrap());
    }
    store.put_raw(&event_key(&ids[2]), br#""not an event""#).await;

    let events = directory.list_active_events().await.unwrap();
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|event| event.id != ids[2]));
    assert!(events.windows(2).all(|pair| pair[0].created_at >= pair[1].created_at));
}

#[tokio::test]
async fn legacy_untagged_counter_still_loads() {
    let store = Arc::new(MemoryStore::default());
    let directory = DirectoryIndex::new(store.clone(), Arc::new(LocalWallet::new("0xA11CE")));
    let far_future = chrono::Utc::now().timestamp() + 3600;
    let blob = format!(
        r#"{{"participants":"3","timestamp":1,"owner":"0xB0B","eventType":"Poetry","expiration":{far_future},"location":"Unknown","description":"","maxParticipants":4}}"#
    );
    store.put_raw(EVENT_KEYS, br#"["legacy"]"#).await;
    store.put_raw(&event_key("legacy"), blob.as_bytes()).await;

    let events = directory.list_active_events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].participants, 3);
    assert_eq!(events[0].icon(), "🎭");

    let joined = directory.join_event("legacy").await.unwrap();
    assert_eq!(joined.participants, 4);
    assert!(matches!(
        directory.join_event("legacy").await,
        Err(AppError::EventFull { .. })
    ));
}

#[tokio::test]
async fn event_blob_without_cap_is_listed_and_joinable() {
    let store = Arc::new(MemoryStore::default());
    let directory = DirectoryIndex::new(store.clone(), Arc::new(LocalWallet::new("0xA11CE")));
    let far_future = chrono::Utc::now().timestamp() + 3600;
    let blob = format!(
        r#"{{"participants":"FHE-NTA=","timestamp":1,"owner":"0xB0B","eventType":"Party","expiration":{far_future},"location":"Unknown","description":""}}"#
    );
    store.put_raw(EVENT_KEYS, br#"["uncapped"]"#).await;
    store.put_raw(&event_key("uncapped"), blob.as_bytes()).await;

    let events = directory.list_active_events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].participants, 50);
    assert_eq!(events[0].max_participants, DEFAULT_MAX_PARTICIPANTS);

    let joined = directory.join_event("uncapped").await.unwrap();
    assert_eq!(joined.participants, 51);
    assert_eq!(directory.get_event("uncapped").await.unwrap().participants, 51);
}
