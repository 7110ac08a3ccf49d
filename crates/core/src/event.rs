// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types for zone state transitions
//!
//! An [`Event`] is an immutable fact about one zone. The zone authority loop
//! stamps each event with the next sequence number of that zone; callers
//! always submit events with `sequence == 0`.

use crate::direction::Direction;
use crate::id::{ActorId, ExitId, LocationId, ObjectId, ZoneId};
use serde::{Deserialize, Serialize};

/// Current version written for every event type
pub const EVENT_VERSION: u16 = 1;

/// Stable wire codes for event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum EventType {
    LocationAddToZone = 1,
    LocationUpdate = 2,
    ExitAddToZone = 3,
    ExitUpdate = 4,
    ExitRemoveFromZone = 5,
    ObjectAddToZone = 6,
    ObjectMove = 7,
    ObjectRemoveFromZone = 8,
    ActorAddToZone = 9,
    ActorMove = 10,
    ActorRemoveFromZone = 11,
    ActorSpeak = 12,
}

impl EventType {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        let ty = match code {
            1 => EventType::LocationAddToZone,
            2 => EventType::LocationUpdate,
            3 => EventType::ExitAddToZone,
            4 => EventType::ExitUpdate,
            5 => EventType::ExitRemoveFromZone,
            6 => EventType::ObjectAddToZone,
            7 => EventType::ObjectMove,
            8 => EventType::ObjectRemoveFromZone,
            9 => EventType::ActorAddToZone,
            10 => EventType::ActorMove,
            11 => EventType::ActorRemoveFromZone,
            12 => EventType::ActorSpeak,
            _ => return None,
        };
        Some(ty)
    }

    /// Name used in logs, e.g. `actor:move`
    pub fn name(self) -> &'static str {
        match self {
            EventType::LocationAddToZone => "location:add",
            EventType::LocationUpdate => "location:update",
            EventType::ExitAddToZone => "exit:add",
            EventType::ExitUpdate => "exit:update",
            EventType::ExitRemoveFromZone => "exit:remove",
            EventType::ObjectAddToZone => "object:add",
            EventType::ObjectMove => "object:move",
            EventType::ObjectRemoveFromZone => "object:remove",
            EventType::ActorAddToZone => "actor:add",
            EventType::ActorMove => "actor:move",
            EventType::ActorRemoveFromZone => "actor:remove",
            EventType::ActorSpeak => "actor:speak",
        }
    }

    /// Broadcast-only events are fanned out but never written to the log
    pub fn is_persistent(self) -> bool {
        !matches!(self, EventType::ActorSpeak)
    }
}

/// Where an exit leads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// A location in the same zone
    Local(LocationId),
    /// A location owned by another zone
    External { zone: ZoneId, location: LocationId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationAddToZone {
    pub location_id: LocationId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub location_id: LocationId,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitAddToZone {
    pub exit_id: ExitId,
    pub source: LocationId,
    pub direction: Direction,
    pub description: String,
    pub destination: Destination,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitUpdate {
    pub exit_id: ExitId,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRemoveFromZone {
    pub exit_id: ExitId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectAddToZone {
    pub object_id: ObjectId,
    pub name: String,
    pub description: String,
    pub location_id: LocationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMove {
    pub object_id: ObjectId,
    pub from: LocationId,
    pub to: LocationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRemoveFromZone {
    pub object_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorAddToZone {
    pub actor_id: ActorId,
    pub name: String,
    pub description: String,
    pub location_id: LocationId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorMove {
    pub from: LocationId,
    pub to: LocationId,
    pub actor_id: ActorId,
}

impl ActorMove {
    pub fn from_to_actor_ids(&self) -> (LocationId, LocationId, ActorId) {
        (self.from, self.to, self.actor_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRemoveFromZone {
    pub actor_id: ActorId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSpeak {
    pub actor_id: ActorId,
    pub location_id: LocationId,
    pub text: String,
}

/// Typed event body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    LocationAddToZone(LocationAddToZone),
    LocationUpdate(LocationUpdate),
    ExitAddToZone(ExitAddToZone),
    ExitUpdate(ExitUpdate),
    ExitRemoveFromZone(ExitRemoveFromZone),
    ObjectAddToZone(ObjectAddToZone),
    ObjectMove(ObjectMove),
    ObjectRemoveFromZone(ObjectRemoveFromZone),
    ActorAddToZone(ActorAddToZone),
    ActorMove(ActorMove),
    ActorRemoveFromZone(ActorRemoveFromZone),
    ActorSpeak(ActorSpeak),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::LocationAddToZone(_) => EventType::LocationAddToZone,
            EventPayload::LocationUpdate(_) => EventType::LocationUpdate,
            EventPayload::ExitAddToZone(_) => EventType::ExitAddToZone,
            EventPayload::ExitUpdate(_) => EventType::ExitUpdate,
            EventPayload::ExitRemoveFromZone(_) => EventType::ExitRemoveFromZone,
            EventPayload::ObjectAddToZone(_) => EventType::ObjectAddToZone,
            EventPayload::ObjectMove(_) => EventType::ObjectMove,
            EventPayload::ObjectRemoveFromZone(_) => EventType::ObjectRemoveFromZone,
            EventPayload::ActorAddToZone(_) => EventType::ActorAddToZone,
            EventPayload::ActorMove(_) => EventType::ActorMove,
            EventPayload::ActorRemoveFromZone(_) => EventType::ActorRemoveFromZone,
            EventPayload::ActorSpeak(_) => EventType::ActorSpeak,
        }
    }

    /// Serialize the variant body alone; the type code travels separately
    pub fn encode_body(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            EventPayload::LocationAddToZone(e) => serde_json::to_vec(e),
            EventPayload::LocationUpdate(e) => serde_json::to_vec(e),
            EventPayload::ExitAddToZone(e) => serde_json::to_vec(e),
            EventPayload::ExitUpdate(e) => serde_json::to_vec(e),
            EventPayload::ExitRemoveFromZone(e) => serde_json::to_vec(e),
            EventPayload::ObjectAddToZone(e) => serde_json::to_vec(e),
            EventPayload::ObjectMove(e) => serde_json::to_vec(e),
            EventPayload::ObjectRemoveFromZone(e) => serde_json::to_vec(e),
            EventPayload::ActorAddToZone(e) => serde_json::to_vec(e),
            EventPayload::ActorMove(e) => serde_json::to_vec(e),
            EventPayload::ActorRemoveFromZone(e) => serde_json::to_vec(e),
            EventPayload::ActorSpeak(e) => serde_json::to_vec(e),
        }
    }

    pub fn decode_body(ty: EventType, body: &[u8]) -> serde_json::Result<Self> {
        let payload = match ty {
            EventType::LocationAddToZone => {
                EventPayload::LocationAddToZone(serde_json::from_slice(body)?)
            }
            EventType::LocationUpdate => EventPayload::LocationUpdate(serde_json::from_slice(body)?),
            EventType::ExitAddToZone => EventPayload::ExitAddToZone(serde_json::from_slice(body)?),
            EventType::ExitUpdate => EventPayload::ExitUpdate(serde_json::from_slice(body)?),
            EventType::ExitRemoveFromZone => {
                EventPayload::ExitRemoveFromZone(serde_json::from_slice(body)?)
            }
            EventType::ObjectAddToZone => {
                EventPayload::ObjectAddToZone(serde_json::from_slice(body)?)
            }
            EventType::ObjectMove => EventPayload::ObjectMove(serde_json::from_slice(body)?),
            EventType::ObjectRemoveFromZone => {
                EventPayload::ObjectRemoveFromZone(serde_json::from_slice(body)?)
            }
            EventType::ActorAddToZone => EventPayload::ActorAddToZone(serde_json::from_slice(body)?),
            EventType::ActorMove => EventPayload::ActorMove(serde_json::from_slice(body)?),
            EventType::ActorRemoveFromZone => {
                EventPayload::ActorRemoveFromZone(serde_json::from_slice(body)?)
            }
            EventType::ActorSpeak => EventPayload::ActorSpeak(serde_json::from_slice(body)?),
        };
        Ok(payload)
    }
}

/// An immutable fact about a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The owning zone
    pub aggregate_id: ZoneId,
    /// Per-zone ordinal, 0 until the zone assigns one
    pub sequence: u64,
    pub version: u16,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(aggregate_id: ZoneId, payload: EventPayload) -> Self {
        Self {
            aggregate_id,
            sequence: 0,
            version: EVENT_VERSION,
            payload,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }

    pub fn name(&self) -> &'static str {
        self.event_type().name()
    }

    pub fn is_assigned(&self) -> bool {
        self.sequence != 0
    }

    pub fn should_persist(&self) -> bool {
        self.event_type().is_persistent()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
