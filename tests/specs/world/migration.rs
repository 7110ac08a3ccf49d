// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! World migration specs
//!
//! Verify actors crossing zone boundaries end up in exactly one zone, keep
//! their observers, and stay there across a restart.

use crate::prelude::*;
use crate::prelude::assert_eq;
use tw_core::SequentialIdGen;

/// Two zones joined by an exit east out of the front door
struct Border {
    dir: DataDir,
    west: ZoneId,
    east: ZoneId,
    door: LocationId,
    meadow: LocationId,
}

impl Border {
    fn new() -> Self {
        let border = Self {
            dir: DataDir::new(),
            west: ZoneId::new_v4(),
            east: ZoneId::new_v4(),
            door: LocationId::new_v4(),
            meadow: LocationId::new_v4(),
        };
        let store = border.dir.store(true);
        let events = [
            location(border.west, border.door, "Front Door").with_sequence(1),
            exit(
                border.west,
                ExitId::new_v4(),
                border.door,
                Direction::East,
                Destination::External {
                    zone: border.east,
                    location: border.meadow,
                },
            )
            .with_sequence(2),
            location(border.east, border.meadow, "Meadow").with_sequence(1),
        ];
        for event in &events {
            store.lock().append(event).unwrap();
        }
        border
    }

    fn config(&self) -> WorldConfig {
        WorldConfig {
            zones: vec![self.west, self.east],
            front_door: FrontDoor {
                zone: self.west,
                location: self.door,
            },
            zone: fast(),
        }
    }

    async fn start(&self) -> tw_engine::WorldHandle {
        World::load_and_start(
            self.config(),
            WorldStorage::new(self.dir.store(true), self.dir.intent_path()),
            SequentialIdGen::new(42),
        )
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn actor_walks_across_border_and_stays_after_restart() {
    let border = Border::new();
    let world = border.start().await;

    let (observer, mut rx) = world.observer();
    let ada = world.add_actor("Ada", "", vec![observer]).await.unwrap();
    let Moved::Migrated(arrived) = world.move_actor(&ada, Direction::East).await.unwrap() else {
        panic!("expected a migration");
    };
    assert_eq!(arrived.zone(), border.east);

    let names: Vec<_> = rx.drain().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["actor:add", "actor:add", "actor:remove"]);
    world.stop().await.unwrap();

    let world = border.start().await;
    let west = world.zone(border.west).await.unwrap().unwrap();
    let east = world.zone(border.east).await.unwrap().unwrap();
    assert!(west.actor(ada.id()).await.unwrap().is_none());
    let state = east.actor(arrived.id()).await.unwrap().unwrap();
    assert_eq!(state.location, border.meadow);
    assert_eq!(state.name, "Ada");
    assert!(west
        .location(border.door)
        .await
        .unwrap()
        .unwrap()
        .actors
        .is_empty());
    world.stop().await.unwrap();

    let (_log, pending) = IntentLog::open_pending(border.dir.intent_path()).unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn snapshot_then_restart_preserves_every_zone() {
    let border = Border::new();
    let world = border.start().await;
    let ada = world.add_actor("Ada", "", vec![]).await.unwrap();
    world.add_actor("Grace", "", vec![]).await.unwrap();

    let mut written = world.snapshot().await.unwrap();
    written.sort();
    let mut expected = vec![(border.west, 4), (border.east, 1)];
    expected.sort();
    assert_eq!(written, expected);

    world.move_actor(&ada, Direction::East).await.unwrap();
    let before: Vec<_> = world
        .stop()
        .await
        .unwrap()
        .iter()
        .map(|z| (z.id(), z.sequence(), z.tables()))
        .collect();

    let world = border.start().await;
    let after: Vec<_> = world
        .stop()
        .await
        .unwrap()
        .iter()
        .map(|z| (z.id(), z.sequence(), z.tables()))
        .collect();
    assert_eq!(after, before);
}
