// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for the behavioral specs

#![allow(dead_code)]

pub use similar_asserts::assert_eq;
pub use std::sync::Arc;
pub use tempfile::TempDir;
pub use tw_core::{
    ActorAddToZone, ActorId, ActorMove, Destination, Direction, Event, EventPayload,
    ExitAddToZone, ExitId, FrontDoor, LocationAddToZone, LocationId, ObjectAddToZone, ObjectId,
    WorldConfig, ZoneConfig, ZoneId,
};
pub use tw_engine::{EntityRef, Moved, World, WorldStorage, Zone, ZoneError};
pub use tw_storage::{EventStore, IntentLog, SharedEventStore};

use std::path::PathBuf;
use std::time::Duration;

/// Zone tuning with a short tick so loop-driven specs finish quickly
pub fn fast() -> ZoneConfig {
    ZoneConfig {
        tick: Duration::from_millis(1),
        ..ZoneConfig::default()
    }
}

pub fn location(zone: ZoneId, id: LocationId, title: &str) -> Event {
    Event::new(
        zone,
        EventPayload::LocationAddToZone(LocationAddToZone {
            location_id: id,
            title: title.to_string(),
            description: String::new(),
        }),
    )
}

pub fn exit(
    zone: ZoneId,
    id: ExitId,
    source: LocationId,
    direction: Direction,
    destination: Destination,
) -> Event {
    Event::new(
        zone,
        EventPayload::ExitAddToZone(ExitAddToZone {
            exit_id: id,
            source,
            direction,
            description: String::new(),
            destination,
        }),
    )
}

pub fn actor(zone: ZoneId, id: ActorId, at: LocationId, name: &str) -> Event {
    Event::new(
        zone,
        EventPayload::ActorAddToZone(ActorAddToZone {
            actor_id: id,
            name: name.to_string(),
            description: String::new(),
            location_id: at,
        }),
    )
}

pub fn object(zone: ZoneId, id: ObjectId, at: LocationId, name: &str) -> Event {
    Event::new(
        zone,
        EventPayload::ObjectAddToZone(ObjectAddToZone {
            object_id: id,
            name: name.to_string(),
            description: String::new(),
            location_id: at,
        }),
    )
}

/// A data directory holding an event log and snapshot dir
pub struct DataDir {
    pub tmp: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn store(&self, compress: bool) -> SharedEventStore {
        SharedEventStore::new(
            EventStore::open(
                self.tmp.path().join("events.dat"),
                self.tmp.path().join("snapshots"),
                compress,
            )
            .unwrap(),
        )
    }

    pub fn intent_path(&self) -> PathBuf {
        self.tmp.path().join("intent.log")
    }
}
