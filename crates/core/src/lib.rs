// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tw-core: shared types for the text-world state engine
//!
//! This crate provides:
//! - Typed identifiers and id generation
//! - Directions for exits
//! - Events, the unit of ordering and persistence
//! - World and zone configuration
//! - The persistence seam used by zones

pub mod config;
pub mod direction;
pub mod event;
pub mod id;
pub mod persist;

pub use config::{FrontDoor, WorldConfig, ZoneConfig};
pub use direction::{Direction, ParseDirectionError};
pub use event::{
    ActorAddToZone, ActorMove, ActorRemoveFromZone, ActorSpeak, Destination, Event, EventPayload,
    EventType, ExitAddToZone, ExitRemoveFromZone, ExitUpdate, LocationAddToZone, LocationUpdate,
    ObjectAddToZone, ObjectMove, ObjectRemoveFromZone, EVENT_VERSION,
};
pub use id::{
    ActorId, ExitId, IdGen, LocationId, ObjectId, SequentialIdGen, TransactionId, UuidIdGen,
    ZoneId,
};
pub use persist::{PersistError, Persister};
