// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Replay and snapshot specs
//!
//! Verify that zone state is a pure function of its event log, and that a
//! snapshot plus the log tail rebuilds the same state as the whole log.

use crate::prelude::*;
use crate::prelude::assert_eq;
use tw_engine::snapshot_events;

fn replayed(id: ZoneId, events: Vec<Event>) -> Zone {
    let mut zone = Zone::new(id, None, fast());
    zone.replay_events(events).unwrap();
    zone
}

/// Drive a live zone through a short story, snapshotting partway
///
/// Returns the stopped zone and the snapshot with its sequence number.
async fn story(store: &SharedEventStore) -> (Zone, u64, Vec<Event>) {
    let id = ZoneId::new_v4();
    let (a, b, c) = (LocationId::new_v4(), LocationId::new_v4(), LocationId::new_v4());
    let zone = Zone::new(id, Some(Arc::new(store.clone())), fast()).start();

    for (loc, title) in [(a, "Hall"), (b, "Library"), (c, "Garden")] {
        zone.submit(location(id, loc, title)).await.unwrap();
    }
    zone.submit(exit(id, ExitId::new_v4(), a, Direction::North, Destination::Local(b)))
        .await
        .unwrap();
    zone.submit(exit(id, ExitId::new_v4(), b, Direction::East, Destination::Local(c)))
        .await
        .unwrap();
    let lamp = zone
        .add_object(ObjectAddToZone {
            object_id: ObjectId::new_v4(),
            name: "lamp".to_string(),
            description: "brass".to_string(),
            location_id: a,
        })
        .await
        .unwrap();
    let ada = zone
        .add_actor(
            ActorAddToZone {
                actor_id: ActorId::new_v4(),
                name: "Ada".to_string(),
                description: String::new(),
                location_id: a,
            },
            vec![],
        )
        .await
        .unwrap();
    ada.move_toward(Direction::North).await.unwrap();
    ada.say("not persisted").await.unwrap();

    let (sequence, snapshot) = zone
        .inspect(|z| (z.sequence(), snapshot_events(z, z.sequence())))
        .await
        .unwrap();

    ada.move_toward(Direction::East).await.unwrap();
    lamp.move_to(c).await.unwrap();
    let hall = zone.location_handle(a).await.unwrap().unwrap();
    hall.describe("Great Hall", "echoing").await.unwrap();
    zone.remove_object(lamp.id()).await.unwrap();

    (zone.shutdown().await.unwrap(), sequence, snapshot)
}

#[tokio::test]
async fn replaying_the_log_twice_yields_identical_tables() {
    let dir = DataDir::new();
    let store = dir.store(true);
    let (live, _, _) = story(&store).await;

    let log = store.lock().events_for_zone(live.id(), u64::MAX).unwrap();
    let first = replayed(live.id(), log.clone());
    let second = replayed(live.id(), log);

    assert_eq!(first.tables(), second.tables());
    assert_eq!(first.tables(), live.tables());
    assert_eq!(first.sequence(), live.sequence());
}

#[tokio::test]
async fn snapshot_plus_log_tail_matches_full_replay() {
    let dir = DataDir::new();
    let store = dir.store(false);
    let (live, sequence, snapshot) = story(&store).await;
    assert!(snapshot.iter().all(|e| e.sequence == sequence));

    let log = store.lock().events_for_zone(live.id(), u64::MAX).unwrap();
    let full = replayed(live.id(), log.clone());

    let mut rebuilt = replayed(live.id(), snapshot);
    assert_eq!(rebuilt.sequence(), sequence);
    rebuilt
        .replay_events(log.into_iter().filter(|e| e.sequence > sequence))
        .unwrap();

    assert_eq!(rebuilt.tables(), full.tables());
    assert_eq!(rebuilt.sequence(), full.sequence());
}

#[tokio::test]
async fn stored_snapshot_fast_forwards_zone_retrieval() {
    let dir = DataDir::new();
    let store = dir.store(true);
    let (live, sequence, snapshot) = story(&store).await;

    store
        .lock()
        .write_snapshot(live.id(), sequence, &snapshot)
        .unwrap();
    let fast_forward = store.lock().events_for_zone(live.id(), u64::MAX).unwrap();

    // Snapshot events first, then only the log tail
    assert_eq!(fast_forward.len(), snapshot.len() + 4);
    assert!(fast_forward[snapshot.len()..]
        .iter()
        .all(|e| e.sequence > sequence));
    assert_eq!(replayed(live.id(), fast_forward).tables(), live.tables());
}
