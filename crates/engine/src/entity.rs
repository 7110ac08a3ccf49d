// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity state held by a zone
//!
//! Relations between entities are stored as ids. The zone tables are the
//! only owners; an actor's `location` is a lookup key, not a reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tw_core::{ActorId, Destination, Direction, ExitId, LocationId, ObjectId, ZoneId};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub zone: ZoneId,
    pub title: String,
    pub description: String,
    pub exits: BTreeSet<ExitId>,
    pub actors: BTreeSet<ActorId>,
    pub objects: BTreeSet<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub id: ExitId,
    pub zone: ZoneId,
    pub source: LocationId,
    pub direction: Direction,
    pub description: String,
    pub destination: Destination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub zone: ZoneId,
    pub name: String,
    pub description: String,
    pub location: LocationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub zone: ZoneId,
    pub name: String,
    pub description: String,
    pub location: LocationId,
}

/// Typed reference to any entity in a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Location(LocationId),
    Exit(ExitId),
    Object(ObjectId),
    Actor(ActorId),
}

impl EntityRef {
    pub fn uuid(&self) -> Uuid {
        match self {
            EntityRef::Location(id) => id.0,
            EntityRef::Exit(id) => id.0,
            EntityRef::Object(id) => id.0,
            EntityRef::Actor(id) => id.0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EntityRef::Location(_) => "location",
            EntityRef::Exit(_) => "exit",
            EntityRef::Object(_) => "object",
            EntityRef::Actor(_) => "actor",
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.uuid())
    }
}

impl From<LocationId> for EntityRef {
    fn from(id: LocationId) -> Self {
        EntityRef::Location(id)
    }
}

impl From<ExitId> for EntityRef {
    fn from(id: ExitId) -> Self {
        EntityRef::Exit(id)
    }
}

impl From<ObjectId> for EntityRef {
    fn from(id: ObjectId) -> Self {
        EntityRef::Object(id)
    }
}

impl From<ActorId> for EntityRef {
    fn from(id: ActorId) -> Self {
        EntityRef::Actor(id)
    }
}
