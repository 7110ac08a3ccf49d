// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for zones and the world

use crate::entity::EntityRef;
use thiserror::Error;
use tw_core::{
    ActorId, Direction, ExitId, FrontDoor, LocationId, ObjectId, PersistError,
    TransactionId, ZoneId,
};
use tw_storage::{IntentLogError, StoreError};

/// Errors returned by a zone
///
/// Everything except `Persist` and `Stopped` is a validation failure: the
/// event was rejected before any state changed and no sequence number was
/// consumed.
#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("location not found: {0}")]
    LocationNotFound(LocationId),
    #[error("exit not found: {0}")]
    ExitNotFound(ExitId),
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
    #[error("actor not found: {0}")]
    ActorNotFound(ActorId),
    #[error("duplicate id: {0}")]
    DuplicateId(EntityRef),
    #[error("no such exit: {direction} from location {location}")]
    NoSuchExit {
        location: LocationId,
        direction: Direction,
    },
    #[error("location {location} already has an exit {direction}")]
    DuplicateExit {
        location: LocationId,
        direction: Direction,
    },
    #[error("event for zone {event} submitted to zone {zone}")]
    ZoneMismatch { zone: ZoneId, event: ZoneId },
    #[error("exit leads out of the zone to location {location} in zone {zone}")]
    ExitLeavesZone { zone: ZoneId, location: LocationId },
    #[error("external exit points back into its own zone {0}")]
    ExternalToSelf(ZoneId),
    #[error("actor {actor} is not in location {location}")]
    ActorNotInLocation {
        actor: ActorId,
        location: LocationId,
    },
    #[error("object {object} is not in location {location}")]
    ObjectNotInLocation {
        object: ObjectId,
        location: LocationId,
    },
    #[error("sequence {sequence} is not after {last}")]
    StaleSequence { sequence: u64, last: u64 },
    #[error("{0} is no longer accepting requests")]
    EntityGone(EntityRef),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("zone authority loop has stopped")]
    Stopped,
}

impl ZoneError {
    /// True when the request was rejected before state changed
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            ZoneError::Persist(_) | ZoneError::Stopped | ZoneError::EntityGone(_)
        )
    }
}

/// Errors returned by the world
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("world requires an event store")]
    MissingEventStore,
    #[error("world requires an intent log")]
    MissingIntentLog,
    #[error("zone {0} is already registered")]
    DuplicateZone(ZoneId),
    #[error("zone {0} is not registered")]
    UnknownZone(ZoneId),
    #[error("front door location {} not found in zone {}", .0.location, .0.zone)]
    FrontDoorNotFound(FrontDoor),
    #[error("actor {actor} is already in zone {zone}")]
    SameZone { actor: ActorId, zone: ZoneId },
    #[error("intent log is not open")]
    IntentLogClosed,
    #[error("recovery of intent {id} failed: {source}")]
    Recovery {
        id: TransactionId,
        #[source]
        source: Box<WorldError>,
    },
    #[error("zone error: {0}")]
    Zone(#[from] ZoneError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("intent log error: {0}")]
    IntentLog(#[from] IntentLogError),
    #[error("world authority loop has stopped")]
    Stopped,
}
