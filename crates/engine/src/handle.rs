// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handles for talking to a running zone
//!
//! Every call is a request plus a private reply channel; the caller
//! suspends until the authority loop answers.

use crate::command::{Command, Control, Inspector, LaneRequest, PendingReply, ZoneRequest};
use crate::entity::{Actor, EntityRef, Exit, Location, Object};
use crate::error::ZoneError;
use crate::observer::{observer_queue, Observer, ObserverId, ObserverReceiver};
use crate::scheduler;
use crate::zone::{Zone, ZoneTables};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tw_core::{
    ActorAddToZone, ActorId, ActorRemoveFromZone, Direction, Event, EventPayload, ExitAddToZone,
    ExitId, ExitRemoveFromZone, LocationAddToZone, LocationId, ObjectAddToZone, ObjectId,
    ObjectRemoveFromZone, ZoneId,
};

/// Handle to a zone's authority loop
#[derive(Clone)]
pub struct ZoneHandle {
    id: ZoneId,
    observer_capacity: usize,
    requests: mpsc::UnboundedSender<ZoneRequest>,
    control: mpsc::UnboundedSender<Control>,
    task: Arc<Mutex<Option<JoinHandle<Zone>>>>,
}

impl ZoneHandle {
    pub(crate) fn spawn(zone: Zone) -> Self {
        let (control, control_rx) = mpsc::unbounded_channel();
        let id = zone.id();
        let observer_capacity = zone.config().observer_capacity;
        let requests = zone.request_sender();
        let task = tokio::spawn(scheduler::run(zone, control_rx));
        Self {
            id,
            observer_capacity,
            requests,
            control,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    /// Run a command as a zone-level request
    pub async fn command(&self, command: Command) -> Result<Event, ZoneError> {
        let (request, pending) = LaneRequest::new(command);
        self.requests
            .send(ZoneRequest::Command(request))
            .map_err(|_| ZoneError::Stopped)?;
        pending.wait().await
    }

    /// Apply an event, assigning a sequence number if it has none
    pub async fn submit(&self, event: Event) -> Result<Event, ZoneError> {
        self.command(Command::Apply(event)).await
    }

    async fn submit_payload(&self, payload: EventPayload) -> Result<Event, ZoneError> {
        self.submit(Event::new(self.id, payload)).await
    }

    pub async fn add_location(
        &self,
        location: LocationAddToZone,
    ) -> Result<LocationHandle, ZoneError> {
        let id = location.location_id;
        self.submit_payload(EventPayload::LocationAddToZone(location))
            .await?;
        self.location_handle(id)
            .await?
            .ok_or(ZoneError::LocationNotFound(id))
    }

    pub async fn add_exit(&self, exit: ExitAddToZone) -> Result<ExitHandle, ZoneError> {
        let id = exit.exit_id;
        self.submit_payload(EventPayload::ExitAddToZone(exit)).await?;
        self.exit_handle(id).await?.ok_or(ZoneError::ExitNotFound(id))
    }

    pub async fn add_object(&self, object: ObjectAddToZone) -> Result<ObjectHandle, ZoneError> {
        let id = object.object_id;
        self.submit_payload(EventPayload::ObjectAddToZone(object))
            .await?;
        self.object_handle(id)
            .await?
            .ok_or(ZoneError::ObjectNotFound(id))
    }

    /// Add an actor; `observers` are attached before the add is fanned out
    pub async fn add_actor(
        &self,
        actor: ActorAddToZone,
        observers: Vec<Observer>,
    ) -> Result<ActorHandle, ZoneError> {
        let id = actor.actor_id;
        self.command(Command::AddActor { actor, observers }).await?;
        self.actor_handle(id)
            .await?
            .ok_or(ZoneError::ActorNotFound(id))
    }

    pub async fn remove_actor(&self, actor_id: ActorId) -> Result<Event, ZoneError> {
        self.submit_payload(EventPayload::ActorRemoveFromZone(ActorRemoveFromZone {
            actor_id,
        }))
        .await
    }

    pub async fn remove_object(&self, object_id: ObjectId) -> Result<Event, ZoneError> {
        self.submit_payload(EventPayload::ObjectRemoveFromZone(ObjectRemoveFromZone {
            object_id,
        }))
        .await
    }

    pub async fn remove_exit(&self, exit_id: ExitId) -> Result<Event, ZoneError> {
        self.submit_payload(EventPayload::ExitRemoveFromZone(ExitRemoveFromZone { exit_id }))
            .await
    }

    /// Watch an existing entity
    pub async fn subscribe(
        &self,
        entity: impl Into<EntityRef>,
        observer: Observer,
    ) -> Result<(), ZoneError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(ZoneRequest::Subscribe {
                entity: entity.into(),
                observer,
                reply,
            })
            .map_err(|_| ZoneError::Stopped)?;
        rx.await.map_err(|_| ZoneError::Stopped)?
    }

    /// Returns whether the observer was watching the entity
    pub async fn unsubscribe(
        &self,
        entity: impl Into<EntityRef>,
        observer: ObserverId,
    ) -> Result<bool, ZoneError> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(ZoneRequest::Unsubscribe {
                entity: entity.into(),
                observer,
                reply,
            })
            .map_err(|_| ZoneError::Stopped)?;
        rx.await.map_err(|_| ZoneError::Stopped)
    }

    /// Subscribe a new queue sized from the zone config
    pub async fn observe(
        &self,
        entity: impl Into<EntityRef>,
    ) -> Result<ObserverReceiver, ZoneError> {
        let (observer, rx) = observer_queue(self.observer_capacity);
        self.subscribe(entity, observer).await?;
        Ok(rx)
    }

    /// Read zone state on the authority loop
    pub async fn inspect<R, F>(&self, f: F) -> Result<R, ZoneError>
    where
        F: FnOnce(&Zone) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let inspector: Inspector = Box::new(move |zone| {
            let _ = tx.send(f(zone));
        });
        self.requests
            .send(ZoneRequest::Inspect(inspector))
            .map_err(|_| ZoneError::Stopped)?;
        rx.await.map_err(|_| ZoneError::Stopped)
    }

    pub async fn sequence(&self) -> Result<u64, ZoneError> {
        self.inspect(Zone::sequence).await
    }

    pub async fn tables(&self) -> Result<ZoneTables, ZoneError> {
        self.inspect(Zone::tables).await
    }

    pub async fn location(&self, id: LocationId) -> Result<Option<Location>, ZoneError> {
        self.inspect(move |zone| zone.location(&id).cloned()).await
    }

    pub async fn exit(&self, id: ExitId) -> Result<Option<Exit>, ZoneError> {
        self.inspect(move |zone| zone.exit(&id).cloned()).await
    }

    pub async fn object(&self, id: ObjectId) -> Result<Option<Object>, ZoneError> {
        self.inspect(move |zone| zone.object(&id).cloned()).await
    }

    pub async fn actor(&self, id: ActorId) -> Result<Option<Actor>, ZoneError> {
        self.inspect(move |zone| zone.actor(&id).cloned()).await
    }

    pub async fn actor_observers(&self, id: ActorId) -> Result<Vec<Observer>, ZoneError> {
        self.inspect(move |zone| zone.observers_of(id.into())).await
    }

    pub async fn location_handle(
        &self,
        id: LocationId,
    ) -> Result<Option<LocationHandle>, ZoneError> {
        self.inspect(move |zone| zone.location_handle(&id)).await
    }

    pub async fn exit_handle(&self, id: ExitId) -> Result<Option<ExitHandle>, ZoneError> {
        self.inspect(move |zone| zone.exit_handle(&id)).await
    }

    pub async fn object_handle(&self, id: ObjectId) -> Result<Option<ObjectHandle>, ZoneError> {
        self.inspect(move |zone| zone.object_handle(&id)).await
    }

    pub async fn actor_handle(&self, id: ActorId) -> Result<Option<ActorHandle>, ZoneError> {
        self.inspect(move |zone| zone.actor_handle(&id)).await
    }

    /// Stop processing requests; returns the last assigned sequence number
    ///
    /// Requests keep queueing while paused and run after `resume`.
    pub async fn pause(&self) -> Result<u64, ZoneError> {
        let (ack, rx) = oneshot::channel();
        self.control
            .send(Control::Pause(ack))
            .map_err(|_| ZoneError::Stopped)?;
        rx.await.map_err(|_| ZoneError::Stopped)
    }

    pub fn resume(&self) -> Result<(), ZoneError> {
        self.control
            .send(Control::Resume)
            .map_err(|_| ZoneError::Stopped)
    }

    /// End the authority loop once the in-flight batch is done
    ///
    /// Returns the zone so it can be inspected or started again. Only the
    /// first call on any clone of the handle gets the zone back.
    pub async fn shutdown(&self) -> Result<Zone, ZoneError> {
        let task = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or(ZoneError::Stopped)?;
        let _ = self.control.send(Control::Shutdown);
        task.await.map_err(|_| ZoneError::Stopped)
    }
}

impl std::fmt::Debug for ZoneHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneHandle").field("id", &self.id).finish()
    }
}

/// Sending side of one entity's lane
#[derive(Debug, Clone)]
struct LaneSender {
    entity: EntityRef,
    tx: mpsc::Sender<LaneRequest>,
}

impl LaneSender {
    async fn send(&self, command: Command) -> Result<PendingReply, ZoneError> {
        let (request, pending) = LaneRequest::new(command);
        self.tx
            .send(request)
            .await
            .map_err(|_| ZoneError::EntityGone(self.entity))?;
        Ok(pending)
    }

    async fn call(&self, command: Command) -> Result<Event, ZoneError> {
        self.send(command).await?.wait().await
    }
}

macro_rules! entity_handle {
    ($(#[$meta:meta])* $name:ident, $id:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            id: $id,
            zone: ZoneId,
            lane: LaneSender,
        }

        impl $name {
            pub(crate) fn new(id: $id, zone: ZoneId, tx: mpsc::Sender<LaneRequest>) -> Self {
                Self {
                    id,
                    zone,
                    lane: LaneSender {
                        entity: id.into(),
                        tx,
                    },
                }
            }

            pub fn id(&self) -> $id {
                self.id
            }

            pub fn zone(&self) -> ZoneId {
                self.zone
            }
        }
    };
}

entity_handle!(
    /// Handle to a location
    LocationHandle,
    LocationId
);
entity_handle!(
    /// Handle to an exit
    ExitHandle,
    ExitId
);
entity_handle!(
    /// Handle to an object
    ObjectHandle,
    ObjectId
);
entity_handle!(
    /// Handle to an actor
    ActorHandle,
    ActorId
);

impl ActorHandle {
    /// Walk through the exit in `direction`
    ///
    /// Fails with `ExitLeavesZone` when the exit leads to another zone; the
    /// world turns that into a migration.
    pub async fn move_toward(&self, direction: Direction) -> Result<Event, ZoneError> {
        self.lane
            .call(Command::Move {
                actor: self.id,
                direction,
            })
            .await
    }

    /// Enqueue on this actor's lane without waiting for the result
    ///
    /// Suspends only while the lane is full.
    #[cfg(test)]
    pub(crate) async fn send(&self, command: Command) -> Result<PendingReply, ZoneError> {
        self.lane.send(command).await
    }

    /// Place the actor in another location of its zone
    pub async fn relocate(&self, to: LocationId) -> Result<Event, ZoneError> {
        self.lane
            .call(Command::Relocate { actor: self.id, to })
            .await
    }

    pub async fn say(&self, text: impl Into<String>) -> Result<Event, ZoneError> {
        self.lane
            .call(Command::Say {
                actor: self.id,
                text: text.into(),
            })
            .await
    }
}

impl LocationHandle {
    pub async fn describe(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Event, ZoneError> {
        self.lane
            .call(Command::DescribeLocation {
                location: self.id,
                title: title.into(),
                description: description.into(),
            })
            .await
    }
}

impl ExitHandle {
    pub async fn describe(&self, description: impl Into<String>) -> Result<Event, ZoneError> {
        self.lane
            .call(Command::DescribeExit {
                exit: self.id,
                description: description.into(),
            })
            .await
    }
}

impl ObjectHandle {
    pub async fn move_to(&self, to: LocationId) -> Result<Event, ZoneError> {
        self.lane
            .call(Command::MoveObject {
                object: self.id,
                to,
            })
            .await
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
