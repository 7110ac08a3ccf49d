// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! World coordination across zones
//!
//! The world is its own authority loop. It owns the zone registry and the
//! intent log, and serializes everything that spans zones: placing new
//! actors, migrations, snapshots and intent recovery.
//!
//! A migration is two zone-local steps (arrive in the destination, leave the
//! source) bracketed by an intent. If the process dies between the steps,
//! the next startup rolls the intent forward.

use crate::error::{WorldError, ZoneError};
use crate::handle::{ActorHandle, ZoneHandle};
use crate::observer::{observer_queue, Observer, ObserverReceiver};
use crate::snapshot::snapshot_events;
use crate::zone::Zone;
use crate::Command;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tw_core::{
    ActorAddToZone, ActorId, ActorRemoveFromZone, Direction, Event, EventPayload, FrontDoor,
    IdGen, LocationId, TransactionId, WorldConfig, ZoneConfig, ZoneId,
};
use tw_storage::{IntentLog, PendingIntent, SharedEventStore};

const WORLD_QUEUE: usize = 64;

/// Durable resources the world needs; both must be present to start
#[derive(Clone, Default)]
pub struct WorldStorage {
    pub events: Option<SharedEventStore>,
    pub intent_log: Option<PathBuf>,
}

impl WorldStorage {
    pub fn new(events: SharedEventStore, intent_log: impl Into<PathBuf>) -> Self {
        Self {
            events: Some(events),
            intent_log: Some(intent_log.into()),
        }
    }
}

/// Result of asking an actor to walk through an exit
#[derive(Debug)]
pub enum Moved {
    /// The move stayed inside the zone
    Local(Event),
    /// The exit led to another zone; the actor now lives there under a new id
    Migrated(ActorHandle),
}

/// Rebuild a zone from the event store, persisting new events back to it
pub fn load_zone(
    store: &SharedEventStore,
    id: ZoneId,
    config: &ZoneConfig,
) -> Result<Zone, WorldError> {
    let events = store.lock().events_for_zone(id, u64::MAX)?;
    let mut zone = Zone::new(id, Some(Arc::new(store.clone())), config.clone());
    let count = zone.replay_events(events)?;
    info!(zone = %id, events = count, sequence = zone.sequence(), "zone loaded");
    Ok(zone)
}

enum WorldRequest {
    AddActor {
        name: String,
        description: String,
        observers: Vec<Observer>,
        reply: oneshot::Sender<Result<ActorHandle, WorldError>>,
    },
    AddZone {
        zone: ZoneHandle,
        reply: oneshot::Sender<Result<(), WorldError>>,
    },
    MigrateActor {
        actor: ActorId,
        from: ZoneId,
        to: ZoneId,
        location: LocationId,
        reply: oneshot::Sender<Result<ActorHandle, WorldError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<Vec<(ZoneId, u64)>, WorldError>>,
    },
    ReplayIntentLog {
        reply: oneshot::Sender<Result<usize, WorldError>>,
    },
    CheckFrontDoor {
        reply: oneshot::Sender<Result<(), WorldError>>,
    },
    Zone {
        id: ZoneId,
        reply: oneshot::Sender<Option<ZoneHandle>>,
    },
    ZoneIds {
        reply: oneshot::Sender<Vec<ZoneId>>,
    },
    Stop {
        reply: oneshot::Sender<Result<Vec<Zone>, WorldError>>,
    },
}

/// State owned by the world loop
pub struct World<G: IdGen> {
    config: WorldConfig,
    store: SharedEventStore,
    intent_path: PathBuf,
    intent: Option<IntentLog>,
    zones: BTreeMap<ZoneId, ZoneHandle>,
    /// Intents this process left open after a persist failure; only a
    /// restart may replay them
    held: BTreeSet<TransactionId>,
    id_gen: G,
}

impl<G: IdGen> World<G> {
    /// Start the world loop, load configured zones and recover intents
    ///
    /// On any startup failure the zones loaded so far are shut down and the
    /// error is returned.
    pub async fn load_and_start(
        config: WorldConfig,
        storage: WorldStorage,
        id_gen: G,
    ) -> Result<WorldHandle, WorldError> {
        let store = storage.events.ok_or(WorldError::MissingEventStore)?;
        let intent_path = storage.intent_log.ok_or(WorldError::MissingIntentLog)?;

        let (tx, rx) = mpsc::channel(WORLD_QUEUE);
        let handle = WorldHandle {
            tx,
            front_door: config.front_door,
            observer_capacity: config.zone.observer_capacity,
            task: Arc::new(Mutex::new(None)),
        };
        let world = World {
            config: config.clone(),
            store: store.clone(),
            intent_path,
            intent: None,
            zones: BTreeMap::new(),
            held: BTreeSet::new(),
            id_gen,
        };
        let task = tokio::spawn(world.run(rx));
        *handle.task.lock().unwrap_or_else(|e| e.into_inner()) = Some(task);

        if let Err(e) = handle.startup(&config, &store).await {
            error!(error = %e, "world startup failed");
            if let Err(stop) = handle.stop().await {
                warn!(error = %stop, "failed to stop world after startup failure");
            }
            return Err(e);
        }
        Ok(handle)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<WorldRequest>) {
        info!(front_door = %self.config.front_door.zone, "world authority loop started");

        while let Some(request) = rx.recv().await {
            match request {
                WorldRequest::AddActor {
                    name,
                    description,
                    observers,
                    reply,
                } => {
                    let _ = reply.send(self.add_actor(name, description, observers).await);
                }
                WorldRequest::AddZone { zone, reply } => {
                    let _ = reply.send(self.add_zone(zone));
                }
                WorldRequest::MigrateActor {
                    actor,
                    from,
                    to,
                    location,
                    reply,
                } => {
                    let _ = reply.send(self.migrate_actor(actor, from, to, location).await);
                }
                WorldRequest::Snapshot { reply } => {
                    let _ = reply.send(self.snapshot().await);
                }
                WorldRequest::ReplayIntentLog { reply } => {
                    let _ = reply.send(self.replay_intent_log().await);
                }
                WorldRequest::CheckFrontDoor { reply } => {
                    let _ = reply.send(self.check_front_door().await);
                }
                WorldRequest::Zone { id, reply } => {
                    let _ = reply.send(self.zones.get(&id).cloned());
                }
                WorldRequest::ZoneIds { reply } => {
                    let _ = reply.send(self.zones.keys().copied().collect());
                }
                WorldRequest::Stop { reply } => {
                    let _ = reply.send(self.stop().await);
                    break;
                }
            }
        }

        info!("world authority loop stopped");
    }

    fn zone(&self, id: ZoneId) -> Result<&ZoneHandle, WorldError> {
        self.zones.get(&id).ok_or(WorldError::UnknownZone(id))
    }

    fn intent_log(&mut self) -> Result<&mut IntentLog, WorldError> {
        self.intent.as_mut().ok_or(WorldError::IntentLogClosed)
    }

    fn add_zone(&mut self, zone: ZoneHandle) -> Result<(), WorldError> {
        let id = zone.id();
        if self.zones.contains_key(&id) {
            return Err(WorldError::DuplicateZone(id));
        }
        self.zones.insert(id, zone);
        info!(zone = %id, "zone registered");
        Ok(())
    }

    async fn check_front_door(&self) -> Result<(), WorldError> {
        let front_door = self.config.front_door;
        let zone = self
            .zones
            .get(&front_door.zone)
            .ok_or(WorldError::FrontDoorNotFound(front_door))?;
        zone.location(front_door.location)
            .await?
            .ok_or(WorldError::FrontDoorNotFound(front_door))?;
        Ok(())
    }

    async fn add_actor(
        &mut self,
        name: String,
        description: String,
        observers: Vec<Observer>,
    ) -> Result<ActorHandle, WorldError> {
        let front_door = self.config.front_door;
        let zone = self.zone(front_door.zone)?.clone();
        let actor = ActorAddToZone {
            actor_id: ActorId(self.id_gen.next()),
            name,
            description,
            location_id: front_door.location,
        };
        debug!(actor = %actor.actor_id, name = %actor.name, "placing actor at front door");
        Ok(zone.add_actor(actor, observers).await?)
    }

    async fn migrate_actor(
        &mut self,
        actor_id: ActorId,
        from: ZoneId,
        to: ZoneId,
        location: LocationId,
    ) -> Result<ActorHandle, WorldError> {
        if from == to {
            return Err(WorldError::SameZone {
                actor: actor_id,
                zone: from,
            });
        }
        let source = self.zone(from)?.clone();
        let dest = self.zone(to)?.clone();

        let actor = source
            .actor(actor_id)
            .await?
            .ok_or(ZoneError::ActorNotFound(actor_id))?;
        dest.location(location)
            .await?
            .ok_or(ZoneError::LocationNotFound(location))?;
        let observers = source.actor_observers(actor_id).await?;

        let new_id = ActorId(self.id_gen.next());
        let arrive = ActorAddToZone {
            actor_id: new_id,
            name: actor.name.clone(),
            description: actor.description.clone(),
            location_id: location,
        };
        let redo = [
            Event::new(to, EventPayload::ActorAddToZone(arrive.clone())),
            Event::new(
                from,
                EventPayload::ActorRemoveFromZone(ActorRemoveFromZone { actor_id }),
            ),
        ];
        let undo = [
            Event::new(
                to,
                EventPayload::ActorRemoveFromZone(ActorRemoveFromZone { actor_id: new_id }),
            ),
            Event::new(
                from,
                EventPayload::ActorAddToZone(ActorAddToZone {
                    actor_id,
                    name: actor.name,
                    description: actor.description,
                    location_id: actor.location,
                }),
            ),
        ];
        let txn = self.intent_log()?.write_intent(&redo, &undo)?;

        // A step whose event was applied but not persisted keeps the intent
        // open so the next startup makes it durable.
        let mut durable = true;
        match dest
            .command(Command::AddActor {
                actor: arrive,
                observers,
            })
            .await
        {
            Ok(_) => {}
            Err(e @ ZoneError::Persist(_)) => {
                warn!(%txn, error = %e, "migration arrival not persisted");
                durable = false;
            }
            Err(e) => {
                // Nothing changed anywhere
                self.intent_log()?.confirm_completion(txn)?;
                return Err(e.into());
            }
        }

        match source.remove_actor(actor_id).await {
            Ok(_) => {}
            Err(e @ ZoneError::Persist(_)) => {
                warn!(%txn, error = %e, "migration departure not persisted");
                durable = false;
            }
            Err(e) => {
                error!(%txn, error = %e, "migration departure failed, intent left for recovery");
                return Err(e.into());
            }
        }

        if durable {
            self.intent_log()?.confirm_completion(txn)?;
        } else {
            self.held.insert(txn);
        }
        info!(
            from = %actor_id,
            to = %new_id,
            source = %from,
            dest = %to,
            "actor migrated"
        );
        Ok(dest
            .actor_handle(new_id)
            .await?
            .ok_or(ZoneError::ActorNotFound(new_id))?)
    }

    /// Re-open the intent log and roll every pending intent forward
    ///
    /// Intents held open by this process after a persist failure stay
    /// pending: their events are applied in memory but not on disk, so only
    /// the next startup can finish them.
    async fn replay_intent_log(&mut self) -> Result<usize, WorldError> {
        self.intent = None;
        let (mut log, pending) = IntentLog::open_pending(&self.intent_path)?;
        let mut count = 0;

        for intent in pending {
            if self.held.contains(&intent.id) {
                debug!(id = %intent.id, "intent held until restart");
                continue;
            }
            self.recover(&intent)
                .await
                .map_err(|e| WorldError::Recovery {
                    id: intent.id,
                    source: Box::new(e),
                })?;
            log.confirm_completion(intent.id)?;
            info!(id = %intent.id, "recovered intent");
            count += 1;
        }

        self.intent = Some(log);
        Ok(count)
    }

    async fn recover(&self, intent: &PendingIntent) -> Result<(), WorldError> {
        for event in &intent.redo {
            let zone = self.zone(event.aggregate_id)?;
            if already_applied(zone, event).await? {
                debug!(id = %intent.id, name = event.name(), "redo step already applied");
                continue;
            }
            zone.submit(event.clone()).await?;
        }
        Ok(())
    }

    /// Snapshot every zone at its current sequence number
    ///
    /// Zones are paused only long enough to read their sequence numbers.
    /// Each snapshot is then built from the event store in a throwaway zone.
    async fn snapshot(&self) -> Result<Vec<(ZoneId, u64)>, WorldError> {
        let mut marks = Vec::with_capacity(self.zones.len());
        let mut paused = Vec::with_capacity(self.zones.len());
        let mut failure = None;
        for (id, zone) in &self.zones {
            match zone.pause().await {
                Ok(sequence) => {
                    marks.push((*id, sequence));
                    paused.push(zone);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        for zone in paused {
            zone.resume()?;
        }
        if let Some(e) = failure {
            return Err(e.into());
        }

        let mut written = Vec::new();
        for (id, sequence) in marks {
            if sequence == 0 {
                continue;
            }
            let events = self.store.lock().events_for_zone(id, sequence)?;
            let mut scratch = Zone::new(id, None, self.config.zone.clone());
            scratch.replay_events(events)?;
            let snapshot = snapshot_events(&scratch, sequence);
            self.store.lock().write_snapshot(id, sequence, &snapshot)?;
            written.push((id, sequence));
        }
        info!(zones = written.len(), "snapshot complete");
        Ok(written)
    }

    /// Shut down every zone, reporting the first failure
    async fn stop(&mut self) -> Result<Vec<Zone>, WorldError> {
        let mut zones = Vec::with_capacity(self.zones.len());
        let mut failure = None;
        for (id, zone) in std::mem::take(&mut self.zones) {
            match zone.shutdown().await {
                Ok(zone) => {
                    zones.push(zone);
                    debug!(zone = %id, "zone stopped");
                }
                Err(e) => {
                    warn!(zone = %id, error = %e, "zone failed to stop");
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e.into()),
            None => Ok(zones),
        }
    }
}

/// Whether a redo step is already reflected in the zone
async fn already_applied(zone: &ZoneHandle, event: &Event) -> Result<bool, ZoneError> {
    match &event.payload {
        EventPayload::ActorAddToZone(e) => Ok(zone.actor(e.actor_id).await?.is_some()),
        EventPayload::ActorRemoveFromZone(e) => Ok(zone.actor(e.actor_id).await?.is_none()),
        _ => Ok(false),
    }
}

/// Handle to the world loop
#[derive(Clone)]
pub struct WorldHandle {
    tx: mpsc::Sender<WorldRequest>,
    front_door: FrontDoor,
    observer_capacity: usize,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl WorldHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> WorldRequest,
    ) -> Result<T, WorldError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| WorldError::Stopped)?;
        rx.await.map_err(|_| WorldError::Stopped)
    }

    async fn startup(
        &self,
        config: &WorldConfig,
        store: &SharedEventStore,
    ) -> Result<(), WorldError> {
        for id in &config.zones {
            let zone = load_zone(store, *id, &config.zone)?.start();
            if let Err(e) = self.add_zone(zone.clone()).await {
                let _ = zone.shutdown().await;
                return Err(e);
            }
        }
        self.request(|reply| WorldRequest::CheckFrontDoor { reply })
            .await??;
        let recovered = self.replay_intent_log().await?;
        info!(zones = config.zones.len(), recovered, "world started");
        Ok(())
    }

    pub fn front_door(&self) -> FrontDoor {
        self.front_door
    }

    /// A new observer queue sized from the zone config
    pub fn observer(&self) -> (Observer, ObserverReceiver) {
        observer_queue(self.observer_capacity)
    }

    /// Place a new actor at the front door
    pub async fn add_actor(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        observers: Vec<Observer>,
    ) -> Result<ActorHandle, WorldError> {
        let (name, description) = (name.into(), description.into());
        self.request(|reply| WorldRequest::AddActor {
            name,
            description,
            observers,
            reply,
        })
        .await?
    }

    /// Register a running zone; a second zone with the same id is rejected
    pub async fn add_zone(&self, zone: ZoneHandle) -> Result<(), WorldError> {
        self.request(|reply| WorldRequest::AddZone { zone, reply })
            .await?
    }

    /// Move an actor into a location of another zone
    ///
    /// The actor gets a new id in the destination; its observers follow it.
    pub async fn migrate_actor(
        &self,
        actor: &ActorHandle,
        zone: ZoneId,
        location: LocationId,
    ) -> Result<ActorHandle, WorldError> {
        let (id, from) = (actor.id(), actor.zone());
        self.request(|reply| WorldRequest::MigrateActor {
            actor: id,
            from,
            to: zone,
            location,
            reply,
        })
        .await?
    }

    /// Walk through an exit, migrating when it leaves the zone
    pub async fn move_actor(
        &self,
        actor: &ActorHandle,
        direction: Direction,
    ) -> Result<Moved, WorldError> {
        match actor.move_toward(direction).await {
            Ok(event) => Ok(Moved::Local(event)),
            Err(ZoneError::ExitLeavesZone { zone, location }) => {
                let migrated = self.migrate_actor(actor, zone, location).await?;
                Ok(Moved::Migrated(migrated))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Snapshot every zone; returns the zones and sequence numbers written
    pub async fn snapshot(&self) -> Result<Vec<(ZoneId, u64)>, WorldError> {
        self.request(|reply| WorldRequest::Snapshot { reply })
            .await?
    }

    /// Roll pending intents forward; returns how many were recovered
    pub async fn replay_intent_log(&self) -> Result<usize, WorldError> {
        self.request(|reply| WorldRequest::ReplayIntentLog { reply })
            .await?
    }

    pub async fn zone(&self, id: ZoneId) -> Result<Option<ZoneHandle>, WorldError> {
        self.request(|reply| WorldRequest::Zone { id, reply }).await
    }

    pub async fn zone_ids(&self) -> Result<Vec<ZoneId>, WorldError> {
        self.request(|reply| WorldRequest::ZoneIds { reply }).await
    }

    /// Shut down every zone and the world loop; returns the final zones
    pub async fn stop(&self) -> Result<Vec<Zone>, WorldError> {
        let stopped = self.request(|reply| WorldRequest::Stop { reply }).await?;
        let task = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(task) = task {
            task.await.map_err(|_| WorldError::Stopped)?;
        }
        stopped
    }
}

#[cfg(test)]
#[path = "world_tests.rs"]
mod tests;
