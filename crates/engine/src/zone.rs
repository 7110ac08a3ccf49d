// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Zone state and the event dispatcher
//!
//! A `Zone` is plain data until `start` moves it onto its authority loop.
//! Before that it can be built up synchronously with `replay_events`, which
//! is how startup and snapshots reconstruct state.

use crate::command::{Command, LaneRequest, ZoneRequest};
use crate::entity::{Actor, EntityRef, Exit, Location, Object};
use crate::error::ZoneError;
use crate::handle::{ActorHandle, ExitHandle, LocationHandle, ObjectHandle, ZoneHandle};
use crate::observer::{Observer, ObserverRegistry};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};
use tw_core::{
    ActorId, ActorMove, ActorSpeak, Destination, Direction, Event, EventPayload, ExitId,
    ExitUpdate, LocationId, LocationUpdate, ObjectId, ObjectMove, Persister, ZoneConfig, ZoneId,
};

/// An entity's state plus its private request channel
pub(crate) struct Lane<T> {
    pub state: T,
    inbox: mpsc::Receiver<LaneRequest>,
    sender: mpsc::Sender<LaneRequest>,
}

impl<T> Lane<T> {
    fn new(state: T, capacity: usize) -> Self {
        let (sender, inbox) = mpsc::channel(capacity.max(1));
        Self {
            state,
            inbox,
            sender,
        }
    }

    pub fn sender(&self) -> mpsc::Sender<LaneRequest> {
        self.sender.clone()
    }

    fn pull(&mut self) -> Option<LaneRequest> {
        self.inbox.try_recv().ok()
    }

    /// Refuse further requests and answer everything still queued
    fn close(mut self, entity: EntityRef) {
        self.inbox.close();
        while let Ok(request) = self.inbox.try_recv() {
            let _ = request.reply.send(Err(ZoneError::EntityGone(entity)));
        }
    }
}

/// Plain copy of every entity table, for comparisons and inspection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZoneTables {
    pub locations: BTreeMap<LocationId, Location>,
    pub exits: BTreeMap<ExitId, Exit>,
    pub objects: BTreeMap<ObjectId, Object>,
    pub actors: BTreeMap<ActorId, Actor>,
}

/// Work pulled for one tick
pub(crate) enum Pulled {
    Zone(ZoneRequest),
    Lane(LaneRequest),
}

/// Observers to attach once the event has been applied
struct Resolved {
    event: Event,
    attach: Option<(EntityRef, Vec<Observer>)>,
}

/// A bounded region of the world with its own event sequence
pub struct Zone {
    id: ZoneId,
    config: ZoneConfig,
    next_sequence: u64,
    persister: Option<Arc<dyn Persister>>,
    locations: BTreeMap<LocationId, Lane<Location>>,
    exits: BTreeMap<ExitId, Lane<Exit>>,
    objects: BTreeMap<ObjectId, Lane<Object>>,
    actors: BTreeMap<ActorId, Lane<Actor>>,
    observers: ObserverRegistry,
    requests: mpsc::UnboundedReceiver<ZoneRequest>,
    request_tx: mpsc::UnboundedSender<ZoneRequest>,
}

impl Zone {
    pub fn new(id: ZoneId, persister: Option<Arc<dyn Persister>>, config: ZoneConfig) -> Self {
        let (request_tx, requests) = mpsc::unbounded_channel();
        Self {
            id,
            config,
            next_sequence: 1,
            persister,
            locations: BTreeMap::new(),
            exits: BTreeMap::new(),
            objects: BTreeMap::new(),
            actors: BTreeMap::new(),
            observers: ObserverRegistry::default(),
            requests,
            request_tx,
        }
    }

    /// New zone with a freshly generated id
    pub fn generate(persister: Option<Arc<dyn Persister>>, config: ZoneConfig) -> Self {
        Self::new(ZoneId::new_v4(), persister, config)
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn config(&self) -> &ZoneConfig {
        &self.config
    }

    /// Last assigned sequence number, 0 when nothing has been applied
    pub fn sequence(&self) -> u64 {
        self.next_sequence - 1
    }

    pub fn location(&self, id: &LocationId) -> Option<&Location> {
        self.locations.get(id).map(|lane| &lane.state)
    }

    pub fn exit(&self, id: &ExitId) -> Option<&Exit> {
        self.exits.get(id).map(|lane| &lane.state)
    }

    pub fn object(&self, id: &ObjectId) -> Option<&Object> {
        self.objects.get(id).map(|lane| &lane.state)
    }

    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.get(id).map(|lane| &lane.state)
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values().map(|lane| &lane.state)
    }

    pub fn exits(&self) -> impl Iterator<Item = &Exit> {
        self.exits.values().map(|lane| &lane.state)
    }

    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.values().map(|lane| &lane.state)
    }

    pub fn actors(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values().map(|lane| &lane.state)
    }

    /// The exit leaving `location` in `direction`, if any
    pub fn exit_toward(&self, location: &Location, direction: Direction) -> Option<&Exit> {
        location
            .exits
            .iter()
            .filter_map(|id| self.exit(id))
            .find(|exit| exit.direction == direction)
    }

    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Location(id) => self.locations.contains_key(&id),
            EntityRef::Exit(id) => self.exits.contains_key(&id),
            EntityRef::Object(id) => self.objects.contains_key(&id),
            EntityRef::Actor(id) => self.actors.contains_key(&id),
        }
    }

    pub fn tables(&self) -> ZoneTables {
        ZoneTables {
            locations: self.locations().map(|l| (l.id, l.clone())).collect(),
            exits: self.exits().map(|e| (e.id, e.clone())).collect(),
            objects: self.objects().map(|o| (o.id, o.clone())).collect(),
            actors: self.actors().map(|a| (a.id, a.clone())).collect(),
        }
    }

    /// Observers currently watching `entity`
    pub fn observers_of(&self, entity: EntityRef) -> Vec<Observer> {
        self.observers.observers_of(entity)
    }

    pub fn location_handle(&self, id: &LocationId) -> Option<LocationHandle> {
        let lane = self.locations.get(id)?;
        Some(LocationHandle::new(*id, self.id, lane.sender()))
    }

    pub fn exit_handle(&self, id: &ExitId) -> Option<ExitHandle> {
        let lane = self.exits.get(id)?;
        Some(ExitHandle::new(*id, self.id, lane.sender()))
    }

    pub fn object_handle(&self, id: &ObjectId) -> Option<ObjectHandle> {
        let lane = self.objects.get(id)?;
        Some(ObjectHandle::new(*id, self.id, lane.sender()))
    }

    pub fn actor_handle(&self, id: &ActorId) -> Option<ActorHandle> {
        let lane = self.actors.get(id)?;
        Some(ActorHandle::new(*id, self.id, lane.sender()))
    }

    /// Apply already-sequenced events in order, bypassing the authority loop
    ///
    /// Sequence numbers are taken as given; the next assigned number follows
    /// the highest one seen. Observers are not notified and nothing is
    /// persisted. Returns the number of events applied.
    pub fn replay_events<I>(&mut self, events: I) -> Result<u64, ZoneError>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut count = 0;
        for event in events {
            self.apply(&event)?;
            self.next_sequence = self.next_sequence.max(event.sequence + 1);
            count += 1;
        }
        debug!(zone = %self.id, count, sequence = self.sequence(), "replayed events");
        Ok(count)
    }

    /// Move the zone onto its authority loop
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self) -> ZoneHandle {
        ZoneHandle::spawn(self)
    }

    /// Type-switch dispatcher: validate, then mutate
    ///
    /// Returns the entities whose observers must hear about the event. On
    /// error nothing has changed.
    pub fn apply(&mut self, event: &Event) -> Result<Vec<EntityRef>, ZoneError> {
        if event.aggregate_id != self.id {
            return Err(ZoneError::ZoneMismatch {
                zone: self.id,
                event: event.aggregate_id,
            });
        }
        let capacity = self.config.lane_capacity;

        match &event.payload {
            EventPayload::LocationAddToZone(e) => {
                let id = e.location_id;
                if self.locations.contains_key(&id) {
                    return Err(ZoneError::DuplicateId(id.into()));
                }
                let location = Location {
                    id,
                    zone: self.id,
                    title: e.title.clone(),
                    description: e.description.clone(),
                    exits: BTreeSet::new(),
                    actors: BTreeSet::new(),
                    objects: BTreeSet::new(),
                };
                self.locations.insert(id, Lane::new(location, capacity));
                Ok(vec![id.into()])
            }

            EventPayload::LocationUpdate(e) => {
                let location = self.location_mut(e.location_id)?;
                location.title = e.title.clone();
                location.description = e.description.clone();
                Ok(vec![e.location_id.into()])
            }

            EventPayload::ExitAddToZone(e) => {
                let id = e.exit_id;
                if self.exits.contains_key(&id) {
                    return Err(ZoneError::DuplicateId(id.into()));
                }
                let source = self.location_state(e.source)?;
                if self.exit_toward(source, e.direction).is_some() {
                    return Err(ZoneError::DuplicateExit {
                        location: e.source,
                        direction: e.direction,
                    });
                }
                match e.destination {
                    Destination::Local(to) => {
                        self.location_state(to)?;
                    }
                    Destination::External { zone, .. } if zone == self.id => {
                        return Err(ZoneError::ExternalToSelf(zone));
                    }
                    Destination::External { .. } => {}
                }

                self.location_mut(e.source)?.exits.insert(id);
                let exit = Exit {
                    id,
                    zone: self.id,
                    source: e.source,
                    direction: e.direction,
                    description: e.description.clone(),
                    destination: e.destination,
                };
                self.exits.insert(id, Lane::new(exit, capacity));
                Ok(vec![e.source.into(), id.into()])
            }

            EventPayload::ExitUpdate(e) => {
                let exit = self.exit_mut(e.exit_id)?;
                exit.description = e.description.clone();
                let source = exit.source;
                Ok(vec![source.into(), e.exit_id.into()])
            }

            EventPayload::ExitRemoveFromZone(e) => {
                let source = self.exit_state(e.exit_id)?.source;
                if let Some(location) = self.locations.get_mut(&source) {
                    location.state.exits.remove(&e.exit_id);
                }
                if let Some(lane) = self.exits.remove(&e.exit_id) {
                    lane.close(e.exit_id.into());
                }
                Ok(vec![source.into(), e.exit_id.into()])
            }

            EventPayload::ObjectAddToZone(e) => {
                let id = e.object_id;
                if self.objects.contains_key(&id) {
                    return Err(ZoneError::DuplicateId(id.into()));
                }
                self.location_mut(e.location_id)?.objects.insert(id);
                let object = Object {
                    id,
                    zone: self.id,
                    name: e.name.clone(),
                    description: e.description.clone(),
                    location: e.location_id,
                };
                self.objects.insert(id, Lane::new(object, capacity));
                Ok(vec![e.location_id.into(), id.into()])
            }

            EventPayload::ObjectMove(e) => {
                let object = self.object_state(e.object_id)?;
                if object.location != e.from {
                    return Err(ZoneError::ObjectNotInLocation {
                        object: e.object_id,
                        location: e.from,
                    });
                }
                self.location_state(e.from)?;
                self.location_state(e.to)?;

                self.location_mut(e.from)?.objects.remove(&e.object_id);
                self.location_mut(e.to)?.objects.insert(e.object_id);
                self.object_mut(e.object_id)?.location = e.to;
                Ok(vec![e.from.into(), e.to.into(), e.object_id.into()])
            }

            EventPayload::ObjectRemoveFromZone(e) => {
                let location = self.object_state(e.object_id)?.location;
                if let Some(lane) = self.locations.get_mut(&location) {
                    lane.state.objects.remove(&e.object_id);
                }
                if let Some(lane) = self.objects.remove(&e.object_id) {
                    lane.close(e.object_id.into());
                }
                Ok(vec![location.into(), e.object_id.into()])
            }

            EventPayload::ActorAddToZone(e) => {
                let id = e.actor_id;
                if self.actors.contains_key(&id) {
                    return Err(ZoneError::DuplicateId(id.into()));
                }
                self.location_mut(e.location_id)?.actors.insert(id);
                let actor = Actor {
                    id,
                    zone: self.id,
                    name: e.name.clone(),
                    description: e.description.clone(),
                    location: e.location_id,
                };
                self.actors.insert(id, Lane::new(actor, capacity));
                Ok(vec![e.location_id.into(), id.into()])
            }

            EventPayload::ActorMove(e) => {
                let (from, to, actor) = e.from_to_actor_ids();
                self.location_state(from)?;
                self.location_state(to)?;
                if self.actor_state(actor)?.location != from {
                    return Err(ZoneError::ActorNotInLocation {
                        actor,
                        location: from,
                    });
                }

                self.location_mut(from)?.actors.remove(&actor);
                self.location_mut(to)?.actors.insert(actor);
                self.actor_mut(actor)?.location = to;
                Ok(vec![from.into(), to.into(), actor.into()])
            }

            EventPayload::ActorRemoveFromZone(e) => {
                let location = self.actor_state(e.actor_id)?.location;
                if let Some(lane) = self.locations.get_mut(&location) {
                    lane.state.actors.remove(&e.actor_id);
                }
                if let Some(lane) = self.actors.remove(&e.actor_id) {
                    lane.close(e.actor_id.into());
                }
                Ok(vec![location.into(), e.actor_id.into()])
            }

            EventPayload::ActorSpeak(e) => {
                if self.actor_state(e.actor_id)?.location != e.location_id {
                    return Err(ZoneError::ActorNotInLocation {
                        actor: e.actor_id,
                        location: e.location_id,
                    });
                }
                Ok(vec![e.location_id.into(), e.actor_id.into()])
            }
        }
    }

    /// Resolve, sequence, apply, persist and fan out one command
    ///
    /// A validation error leaves the zone untouched and consumes no
    /// sequence number. A persistence error is returned after the state
    /// change has been kept and observers notified.
    pub(crate) fn process(&mut self, command: Command) -> Result<Event, ZoneError> {
        let Resolved { mut event, attach } = self.resolve(command)?;

        if !event.is_assigned() {
            event.sequence = self.next_sequence;
        } else if event.sequence < self.next_sequence {
            return Err(ZoneError::StaleSequence {
                sequence: event.sequence,
                last: self.sequence(),
            });
        }

        let touched = self.apply(&event)?;
        self.next_sequence = event.sequence + 1;
        debug!(
            zone = %self.id,
            sequence = event.sequence,
            name = event.name(),
            "event applied"
        );

        if let Some((entity, observers)) = attach {
            for observer in observers {
                self.observers.subscribe(entity, observer);
            }
        }

        let persisted = match &self.persister {
            Some(persister) if event.should_persist() => persister.persist(&event),
            _ => Ok(()),
        };

        self.observers.notify(&touched, &event);
        if let Some(gone) = removed_entity(&event) {
            self.observers.forget(gone);
        }

        if let Err(e) = persisted {
            error!(
                zone = %self.id,
                sequence = event.sequence,
                name = event.name(),
                error = %e,
                "failed to persist event, in-memory state kept"
            );
            return Err(e.into());
        }
        Ok(event)
    }

    /// Turn a command into the event it stands for
    fn resolve(&self, command: Command) -> Result<Resolved, ZoneError> {
        let event = match command {
            Command::Apply(event) => event,

            Command::AddActor { actor, observers } => {
                let entity = EntityRef::Actor(actor.actor_id);
                return Ok(Resolved {
                    event: Event::new(self.id, EventPayload::ActorAddToZone(actor)),
                    attach: Some((entity, observers)),
                });
            }

            Command::Move { actor, direction } => {
                let from = self.actor_state(actor)?.location;
                let location = self.location_state(from)?;
                let exit = self
                    .exit_toward(location, direction)
                    .ok_or(ZoneError::NoSuchExit {
                        location: from,
                        direction,
                    })?;
                let to = match exit.destination {
                    Destination::Local(to) => to,
                    Destination::External { zone, location } => {
                        return Err(ZoneError::ExitLeavesZone { zone, location })
                    }
                };
                self.event(EventPayload::ActorMove(ActorMove {
                    from,
                    to,
                    actor_id: actor,
                }))
            }

            Command::Relocate { actor, to } => {
                let from = self.actor_state(actor)?.location;
                self.event(EventPayload::ActorMove(ActorMove {
                    from,
                    to,
                    actor_id: actor,
                }))
            }

            Command::Say { actor, text } => {
                let location_id = self.actor_state(actor)?.location;
                self.event(EventPayload::ActorSpeak(ActorSpeak {
                    actor_id: actor,
                    location_id,
                    text,
                }))
            }

            Command::DescribeLocation {
                location,
                title,
                description,
            } => self.event(EventPayload::LocationUpdate(LocationUpdate {
                location_id: location,
                title,
                description,
            })),

            Command::DescribeExit { exit, description } => {
                self.event(EventPayload::ExitUpdate(ExitUpdate {
                    exit_id: exit,
                    description,
                }))
            }

            Command::MoveObject { object, to } => {
                let from = self.object_state(object)?.location;
                self.event(EventPayload::ObjectMove(ObjectMove {
                    object_id: object,
                    from,
                    to,
                }))
            }
        };
        Ok(Resolved {
            event,
            attach: None,
        })
    }

    fn event(&self, payload: EventPayload) -> Event {
        Event::new(self.id, payload)
    }

    /// Everything due this tick: all zone-level requests, then at most one
    /// request per lane in table order
    pub(crate) fn gather(&mut self) -> Vec<Pulled> {
        let mut batch = Vec::new();
        while let Ok(request) = self.requests.try_recv() {
            batch.push(Pulled::Zone(request));
        }
        batch.extend(self.locations.values_mut().filter_map(Lane::pull).map(Pulled::Lane));
        batch.extend(self.exits.values_mut().filter_map(Lane::pull).map(Pulled::Lane));
        batch.extend(self.objects.values_mut().filter_map(Lane::pull).map(Pulled::Lane));
        batch.extend(self.actors.values_mut().filter_map(Lane::pull).map(Pulled::Lane));
        batch
    }

    pub(crate) fn dispatch(&mut self, pulled: Pulled) {
        match pulled {
            Pulled::Lane(request) | Pulled::Zone(ZoneRequest::Command(request)) => {
                let result = self.process(request.command);
                if let Err(e) = &result {
                    debug!(zone = %self.id, error = %e, "request rejected");
                }
                let _ = request.reply.send(result);
            }
            Pulled::Zone(ZoneRequest::Subscribe {
                entity,
                observer,
                reply,
            }) => {
                let result = self.require(entity).map(|()| {
                    self.observers.subscribe(entity, observer);
                });
                let _ = reply.send(result);
            }
            Pulled::Zone(ZoneRequest::Unsubscribe {
                entity,
                observer,
                reply,
            }) => {
                let _ = reply.send(self.observers.unsubscribe(entity, observer));
            }
            Pulled::Zone(ZoneRequest::Inspect(inspect)) => inspect(self),
        }
    }

    pub(crate) fn request_sender(&self) -> mpsc::UnboundedSender<ZoneRequest> {
        self.request_tx.clone()
    }

    fn require(&self, entity: EntityRef) -> Result<(), ZoneError> {
        if self.contains(entity) {
            return Ok(());
        }
        Err(match entity {
            EntityRef::Location(id) => ZoneError::LocationNotFound(id),
            EntityRef::Exit(id) => ZoneError::ExitNotFound(id),
            EntityRef::Object(id) => ZoneError::ObjectNotFound(id),
            EntityRef::Actor(id) => ZoneError::ActorNotFound(id),
        })
    }

    fn location_state(&self, id: LocationId) -> Result<&Location, ZoneError> {
        self.location(&id).ok_or(ZoneError::LocationNotFound(id))
    }

    fn location_mut(&mut self, id: LocationId) -> Result<&mut Location, ZoneError> {
        self.locations
            .get_mut(&id)
            .map(|lane| &mut lane.state)
            .ok_or(ZoneError::LocationNotFound(id))
    }

    fn exit_state(&self, id: ExitId) -> Result<&Exit, ZoneError> {
        self.exit(&id).ok_or(ZoneError::ExitNotFound(id))
    }

    fn exit_mut(&mut self, id: ExitId) -> Result<&mut Exit, ZoneError> {
        self.exits
            .get_mut(&id)
            .map(|lane| &mut lane.state)
            .ok_or(ZoneError::ExitNotFound(id))
    }

    fn object_state(&self, id: ObjectId) -> Result<&Object, ZoneError> {
        self.object(&id).ok_or(ZoneError::ObjectNotFound(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object, ZoneError> {
        self.objects
            .get_mut(&id)
            .map(|lane| &mut lane.state)
            .ok_or(ZoneError::ObjectNotFound(id))
    }

    fn actor_state(&self, id: ActorId) -> Result<&Actor, ZoneError> {
        self.actor(&id).ok_or(ZoneError::ActorNotFound(id))
    }

    fn actor_mut(&mut self, id: ActorId) -> Result<&mut Actor, ZoneError> {
        self.actors
            .get_mut(&id)
            .map(|lane| &mut lane.state)
            .ok_or(ZoneError::ActorNotFound(id))
    }
}

/// The entity an event takes out of the zone
fn removed_entity(event: &Event) -> Option<EntityRef> {
    match &event.payload {
        EventPayload::ExitRemoveFromZone(e) => Some(e.exit_id.into()),
        EventPayload::ObjectRemoveFromZone(e) => Some(e.object_id.into()),
        EventPayload::ActorRemoveFromZone(e) => Some(e.actor_id.into()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "zone_tests.rs"]
mod tests;
