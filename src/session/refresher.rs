//! Cosmetic participant counter shown while an event is open.
//!
//! Every tick moves the displayed count by -1, 0 or +1, clamped to
//! `[1, max]`. It is not derived from the stored counter and nothing reads
//! it back.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::SessionEvent;

pub fn random_walk_step(current: u32, max: u32, delta: i64) -> u32 {
    let upper = i64::from(max.max(1));
    (i64::from(current) + delta).clamp(1, upper) as u32
}

pub fn spawn_participant_refresher(
    event_id: String,
    start: u32,
    max: u32,
    period: Duration,
    events: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut count = start;
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            count = random_walk_step(count, max, rand::random_range(-1..=1));
            let tick = SessionEvent::ParticipantTick {
                event_id: event_id.clone(),
                count,
            };
            if events.send(tick).await.is_err() {
                break;
            }
        }
        log::debug!("Participant refresher for {event_id} stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_is_clamped() {
        assert_eq!(random_walk_step(1, 10, -1), 1);
        assert_eq!(random_walk_step(10, 10, 1), 10);
        assert_eq!(random_walk_step(5, 10, 1), 6);
        assert_eq!(random_walk_step(5, 10, 0), 5);
        assert_eq!(random_walk_step(0, 10, 0), 1);
        assert_eq!(random_walk_step(30, 10, 0), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_stay_in_range_and_stop_when_receiver_drops() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_participant_refresher(
            "ev".to_string(),
            2,
            3,
            Duration::from_millis(3000),
            tx,
        );

        for _ in 0..5 {
            match rx.recv().await {
                Some(SessionEvent::ParticipantTick { event_id, count }) => {
                    assert_eq!(event_id, "ev");
                    assert!((1..=3).contains(&count));
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }

        drop(rx);
        handle.await.unwrap();
    }
}
