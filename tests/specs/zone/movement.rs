// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zone movement specs
//!
//! Verify walking through exits: the resulting event, its persistence and
//! who hears about it.

use crate::prelude::*;
use crate::prelude::assert_eq;

/// Location A with a north exit into B, actor X standing in A
struct Hallway {
    zone: ZoneId,
    a: LocationId,
    b: LocationId,
    x: ActorId,
}

impl Hallway {
    fn new() -> Self {
        Self {
            zone: ZoneId::new_v4(),
            a: LocationId::new_v4(),
            b: LocationId::new_v4(),
            x: ActorId::new_v4(),
        }
    }

    /// Build the zone from unsequenced setup events so live events start at 1
    fn zone(&self, store: &SharedEventStore) -> Zone {
        let mut zone = Zone::new(self.zone, Some(Arc::new(store.clone())), fast());
        zone.replay_events([
            location(self.zone, self.a, "A"),
            location(self.zone, self.b, "B"),
            exit(
                self.zone,
                ExitId::new_v4(),
                self.a,
                Direction::North,
                Destination::Local(self.b),
            ),
            actor(self.zone, self.x, self.a, "X"),
        ])
        .unwrap();
        zone
    }
}

#[tokio::test]
async fn move_north_relocates_actor_persists_and_notifies_once_each() {
    let dir = DataDir::new();
    let store = dir.store(true);
    let hall = Hallway::new();
    let zone = hall.zone(&store).start();

    let mut at_a = zone.observe(hall.a).await.unwrap();
    let mut at_b = zone.observe(hall.b).await.unwrap();
    let mut on_x = zone.observe(hall.x).await.unwrap();

    let x = zone.actor_handle(hall.x).await.unwrap().unwrap();
    let event = x.move_toward(Direction::North).await.unwrap();

    assert_eq!(event.sequence, 1);
    let EventPayload::ActorMove(ref moved) = event.payload else {
        panic!("expected an actor move, got {:?}", event.payload);
    };
    assert_eq!(moved.from_to_actor_ids(), (hall.a, hall.b, hall.x));
    assert_eq!(zone.actor(hall.x).await.unwrap().unwrap().location, hall.b);

    let persisted = store.lock().read_all().unwrap();
    assert_eq!(persisted, vec![event.clone()]);

    for rx in [&mut at_a, &mut at_b, &mut on_x] {
        let seen = rx.drain();
        assert_eq!(seen.len(), 1);
        assert_eq!(*seen[0], event);
    }

    zone.shutdown().await.unwrap();
}

#[tokio::test]
async fn move_without_exit_is_rejected_before_sequencing() {
    let dir = DataDir::new();
    let store = dir.store(false);
    let hall = Hallway::new();
    let zone = hall.zone(&store).start();
    let mut on_x = zone.observe(hall.x).await.unwrap();

    let x = zone.actor_handle(hall.x).await.unwrap().unwrap();
    let err = x.move_toward(Direction::South).await.unwrap_err();

    assert!(matches!(
        err,
        ZoneError::NoSuchExit { location, direction: Direction::South } if location == hall.a
    ));
    assert_eq!(zone.sequence().await.unwrap(), 0);
    assert_eq!(zone.actor(hall.x).await.unwrap().unwrap().location, hall.a);
    assert!(store.lock().read_all().unwrap().is_empty());
    assert!(on_x.drain().is_empty());

    // The zone keeps serving after a rejected request
    let event = x.move_toward(Direction::North).await.unwrap();
    assert_eq!(event.sequence, 1);

    zone.shutdown().await.unwrap();
}

#[tokio::test]
async fn zone_level_requests_go_ahead_of_entity_lanes() {
    let hall = Hallway::new();
    let mut zone = Zone::new(hall.zone, None, fast());
    zone.replay_events([
        location(hall.zone, hall.a, "A"),
        actor(hall.zone, hall.x, hall.a, "X"),
    ])
    .unwrap();
    let zone = zone.start();
    let x = zone.actor_handle(hall.x).await.unwrap().unwrap();
    zone.pause().await.unwrap();

    let said = tokio::spawn({
        let x = x.clone();
        async move { x.say("first in line").await }
    });
    // The lane request is queued before the zone-level one
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let added = tokio::spawn({
        let zone = zone.clone();
        let b = hall.b;
        async move { zone.submit(location(zone.id(), b, "B")).await }
    });
    // Let the submission reach the paused zone
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    zone.resume().unwrap();
    let added = added.await.unwrap().unwrap();
    let said = said.await.unwrap().unwrap();

    assert_eq!(added.sequence, 1);
    assert_eq!(said.sequence, 2);
    zone.shutdown().await.unwrap();
}
