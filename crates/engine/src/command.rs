// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Requests carried to a zone's authority loop
//!
//! A command only lives for one request/response round trip and is never
//! persisted; the event it resolves to is.

use crate::entity::EntityRef;
use crate::error::ZoneError;
use crate::observer::{Observer, ObserverId};
use crate::zone::Zone;
use tokio::sync::oneshot;
use tw_core::{
    ActorAddToZone, ActorId, Direction, Event, ExitId, LocationId, ObjectId,
};

/// Something a caller asks a zone to do
#[derive(Debug)]
pub enum Command {
    /// Apply a ready-made event
    Apply(Event),
    /// Add an actor and attach observers before the add is fanned out
    AddActor {
        actor: ActorAddToZone,
        observers: Vec<Observer>,
    },
    /// Walk through the exit in `direction` from the actor's location
    Move { actor: ActorId, direction: Direction },
    /// Place an actor in any local location, ignoring exits
    Relocate { actor: ActorId, to: LocationId },
    Say { actor: ActorId, text: String },
    DescribeLocation {
        location: LocationId,
        title: String,
        description: String,
    },
    DescribeExit { exit: ExitId, description: String },
    MoveObject { object: ObjectId, to: LocationId },
}

pub(crate) type ReplySender = oneshot::Sender<Result<Event, ZoneError>>;

/// A command with the channel its result goes back on
pub(crate) struct LaneRequest {
    pub command: Command,
    pub reply: ReplySender,
}

impl LaneRequest {
    pub fn new(command: Command) -> (Self, PendingReply) {
        let (reply, rx) = oneshot::channel();
        (Self { command, reply }, PendingReply(rx))
    }
}

pub(crate) type Inspector = Box<dyn FnOnce(&Zone) + Send>;

/// Zone-level requests, drained in full every tick
pub(crate) enum ZoneRequest {
    Command(LaneRequest),
    Subscribe {
        entity: EntityRef,
        observer: Observer,
        reply: oneshot::Sender<Result<(), ZoneError>>,
    },
    Unsubscribe {
        entity: EntityRef,
        observer: ObserverId,
        reply: oneshot::Sender<bool>,
    },
    Inspect(Inspector),
}

/// Loop control, checked between ticks
pub(crate) enum Control {
    /// Stop processing and report the last assigned sequence number
    Pause(oneshot::Sender<u64>),
    Resume,
    Shutdown,
}

/// Reply to a command that has been enqueued but not yet answered
#[must_use = "the reply carries the command's result"]
pub struct PendingReply(oneshot::Receiver<Result<Event, ZoneError>>);

impl PendingReply {
    /// Wait for the authority loop to answer
    pub async fn wait(self) -> Result<Event, ZoneError> {
        self.0.await.map_err(|_| ZoneError::Stopped)?
    }
}
