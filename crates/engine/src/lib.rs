// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Zone authority loops, observers, snapshots and world coordination

mod command;
mod entity;
mod error;
mod handle;
mod observer;
mod scheduler;
mod snapshot;
#[cfg(test)]
mod testing;
mod world;
mod zone;

pub use command::{Command, PendingReply};
pub use entity::{Actor, EntityRef, Exit, Location, Object};
pub use error::{WorldError, ZoneError};
pub use handle::{ActorHandle, ExitHandle, LocationHandle, ObjectHandle, ZoneHandle};
pub use observer::{observer_queue, Observer, ObserverId, ObserverReceiver};
pub use snapshot::{snapshot_events, Snapshottable};
pub use world::{load_zone, Moved, World, WorldHandle, WorldStorage};
pub use zone::{Zone, ZoneTables};
