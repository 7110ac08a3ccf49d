// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by the engine's unit tests

use crate::command::Command;
use crate::zone::Zone;
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tw_core::{
    ActorAddToZone, ActorId, ActorRemoveFromZone, Destination, Direction, Event, EventPayload,
    ExitAddToZone, ExitId, ExitRemoveFromZone, LocationAddToZone, LocationId, ObjectAddToZone,
    ObjectId, PersistError, Persister, ZoneConfig, ZoneId,
};
use uuid::Uuid;

pub fn zone_id(n: u64) -> ZoneId {
    ZoneId(Uuid::from_u64_pair(0x20, n))
}

pub fn location_id(n: u64) -> LocationId {
    LocationId(Uuid::from_u64_pair(0x21, n))
}

pub fn exit_id(n: u64) -> ExitId {
    ExitId(Uuid::from_u64_pair(0x22, n))
}

pub fn object_id(n: u64) -> ObjectId {
    ObjectId(Uuid::from_u64_pair(0x23, n))
}

pub fn actor_id(n: u64) -> ActorId {
    ActorId(Uuid::from_u64_pair(0x24, n))
}

/// Fast ticks so loop tests stay quick
pub fn config() -> ZoneConfig {
    ZoneConfig {
        tick: Duration::from_millis(1),
        ..ZoneConfig::default()
    }
}

pub fn location_added(zone: ZoneId, id: LocationId, title: &str) -> Event {
    Event::new(
        zone,
        EventPayload::LocationAddToZone(LocationAddToZone {
            location_id: id,
            title: title.to_string(),
            description: format!("{title} description"),
        }),
    )
}

pub fn exit_added(
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
            description: format!("a way {direction}"),
            destination,
        }),
    )
}

pub fn actor_add(id: ActorId, location: LocationId, name: &str) -> ActorAddToZone {
    ActorAddToZone {
        actor_id: id,
        name: name.to_string(),
        description: format!("{name} stands here"),
        location_id: location,
    }
}

pub fn actor_added(zone: ZoneId, id: ActorId, location: LocationId, name: &str) -> Event {
    Event::new(
        zone,
        EventPayload::ActorAddToZone(actor_add(id, location, name)),
    )
}

pub fn object_added(zone: ZoneId, id: ObjectId, location: LocationId, name: &str) -> Event {
    Event::new(
        zone,
        EventPayload::ObjectAddToZone(ObjectAddToZone {
            object_id: id,
            name: name.to_string(),
            description: format!("a {name}"),
            location_id: location,
        }),
    )
}

/// Ids of the two-room fixture
pub struct Rooms {
    pub zone: ZoneId,
    /// Location A, no exits of its own besides north
    pub a: LocationId,
    /// Location B, north of A
    pub b: LocationId,
    pub north: ExitId,
    /// Actor X, standing in A
    pub x: ActorId,
}

impl Default for Rooms {
    fn default() -> Self {
        Self {
            zone: zone_id(1),
            a: location_id(1),
            b: location_id(2),
            north: exit_id(1),
            x: actor_id(1),
        }
    }
}

impl Rooms {
    /// Setup events without sequence numbers, so the zone's next number
    /// stays at 1 after replay
    pub fn setup(&self) -> Vec<Event> {
        vec![
            location_added(self.zone, self.a, "A"),
            location_added(self.zone, self.b, "B"),
            exit_added(
                self.zone,
                self.north,
                self.a,
                Direction::North,
                Destination::Local(self.b),
            ),
            actor_added(self.zone, self.x, self.a, "X"),
        ]
    }

    pub fn zone(&self, persister: Option<Arc<dyn Persister>>) -> Zone {
        let mut zone = Zone::new(self.zone, persister, config());
        zone.replay_events(self.setup()).unwrap();
        zone
    }
}

/// Persister that keeps events in memory and can be told to fail
#[derive(Clone, Default)]
pub struct RecordingPersister {
    events: Arc<Mutex<Vec<Event>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingPersister {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn shared(&self) -> Option<Arc<dyn Persister>> {
        Some(Arc::new(self.clone()))
    }
}

impl Persister for RecordingPersister {
    fn persist(&self, event: &Event) -> Result<(), PersistError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PersistError::new(event, "disk full"));
        }
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// One step of a random zone history
#[derive(Debug, Clone)]
pub enum Op {
    AddLocation,
    AddExit { from: usize, to: usize, direction: usize },
    AddActor { location: usize },
    AddObject { location: usize },
    MoveActor { actor: usize, direction: usize },
    Relocate { actor: usize, location: usize },
    MoveObject { object: usize, location: usize },
    Describe { location: usize },
    RemoveActor { actor: usize },
    RemoveExit { exit: usize },
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::AddLocation),
        3 => (0..8usize, 0..8usize, 0..6usize)
            .prop_map(|(from, to, direction)| Op::AddExit { from, to, direction }),
        2 => (0..8usize).prop_map(|location| Op::AddActor { location }),
        1 => (0..8usize).prop_map(|location| Op::AddObject { location }),
        4 => (0..8usize, 0..6usize).prop_map(|(actor, direction)| Op::MoveActor { actor, direction }),
        1 => (0..8usize, 0..8usize).prop_map(|(actor, location)| Op::Relocate { actor, location }),
        1 => (0..8usize, 0..8usize).prop_map(|(object, location)| Op::MoveObject { object, location }),
        1 => (0..8usize).prop_map(|location| Op::Describe { location }),
        1 => (0..8usize).prop_map(|actor| Op::RemoveActor { actor }),
        1 => (0..8usize).prop_map(|exit| Op::RemoveExit { exit }),
    ]
}

/// Drive `zone` through `ops`, returning every accepted event
///
/// Out-of-range picks wrap around; rejected commands are skipped.
pub fn run_ops(zone: &mut Zone, ops: &[Op]) -> Vec<Event> {
    let id = zone.id();
    let mut locations: Vec<LocationId> = Vec::new();
    let mut exits: Vec<ExitId> = Vec::new();
    let mut actors: Vec<ActorId> = Vec::new();
    let mut objects: Vec<ObjectId> = Vec::new();
    let mut accepted = Vec::new();

    fn pick<T: Copy>(items: &[T], n: usize) -> Option<T> {
        if items.is_empty() {
            None
        } else {
            Some(items[n % items.len()])
        }
    }

    for (n, op) in ops.iter().enumerate() {
        let n = n as u64 + 1;
        let command = match op {
            Op::AddLocation => {
                locations.push(location_id(n));
                Command::Apply(location_added(id, location_id(n), "room"))
            }
            Op::AddExit {
                from,
                to,
                direction,
            } => {
                let (Some(from), Some(to)) = (pick(&locations, *from), pick(&locations, *to))
                else {
                    continue;
                };
                exits.push(exit_id(n));
                Command::Apply(exit_added(
                    id,
                    exit_id(n),
                    from,
                    Direction::ALL[direction % Direction::ALL.len()],
                    Destination::Local(to),
                ))
            }
            Op::AddActor { location } => {
                let Some(location) = pick(&locations, *location) else {
                    continue;
                };
                actors.push(actor_id(n));
                Command::Apply(actor_added(id, actor_id(n), location, "walker"))
            }
            Op::AddObject { location } => {
                let Some(location) = pick(&locations, *location) else {
                    continue;
                };
                objects.push(object_id(n));
                Command::Apply(object_added(id, object_id(n), location, "stone"))
            }
            Op::MoveActor { actor, direction } => {
                let Some(actor) = pick(&actors, *actor) else {
                    continue;
                };
                Command::Move {
                    actor,
                    direction: Direction::ALL[direction % Direction::ALL.len()],
                }
            }
            Op::Relocate { actor, location } => {
                let (Some(actor), Some(to)) = (pick(&actors, *actor), pick(&locations, *location))
                else {
                    continue;
                };
                Command::Relocate { actor, to }
            }
            Op::MoveObject { object, location } => {
                let (Some(object), Some(to)) =
                    (pick(&objects, *object), pick(&locations, *location))
                else {
                    continue;
                };
                Command::MoveObject { object, to }
            }
            Op::Describe { location } => {
                let Some(location) = pick(&locations, *location) else {
                    continue;
                };
                Command::DescribeLocation {
                    location,
                    title: format!("room {n}"),
                    description: format!("changed at step {n}"),
                }
            }
            Op::RemoveActor { actor } => {
                let Some(actor_id) = pick(&actors, *actor) else {
                    continue;
                };
                Command::Apply(Event::new(
                    id,
                    EventPayload::ActorRemoveFromZone(ActorRemoveFromZone { actor_id }),
                ))
            }
            Op::RemoveExit { exit } => {
                let Some(exit_id) = pick(&exits, *exit) else {
                    continue;
                };
                Command::Apply(Event::new(
                    id,
                    EventPayload::ExitRemoveFromZone(ExitRemoveFromZone { exit_id }),
                ))
            }
        };
        if let Ok(event) = zone.process(command) {
            accepted.push(event);
        }
    }
    accepted
}
