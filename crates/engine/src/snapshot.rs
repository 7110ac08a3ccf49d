// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Point-in-time snapshots of a zone
//!
//! Entities form a dependency graph: exits need their source and any local
//! destination, objects and actors need their location. A snapshot is one
//! add event per entity in an order where every dependency comes first, so
//! replaying it into an empty zone rebuilds the same tables.

use crate::entity::{Actor, EntityRef, Exit, Location, Object};
use crate::zone::Zone;
use std::collections::HashMap;
use tw_core::{
    ActorAddToZone, Destination, Event, EventPayload, ExitAddToZone, LocationAddToZone,
    ObjectAddToZone, ZoneId,
};

/// An entity that can describe itself as snapshot events
pub trait Snapshottable {
    fn node(&self) -> EntityRef;

    /// Entities that must exist before this one can be added
    fn dependencies(&self) -> Vec<EntityRef>;

    /// Events recreating this entity, stamped with `sequence`
    fn snapshot(&self, zone: ZoneId, sequence: u64) -> Vec<Event>;
}

impl Snapshottable for Location {
    fn node(&self) -> EntityRef {
        self.id.into()
    }

    fn dependencies(&self) -> Vec<EntityRef> {
        Vec::new()
    }

    fn snapshot(&self, zone: ZoneId, sequence: u64) -> Vec<Event> {
        let payload = EventPayload::LocationAddToZone(LocationAddToZone {
            location_id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
        });
        vec![Event::new(zone, payload).with_sequence(sequence)]
    }
}

impl Snapshottable for Exit {
    fn node(&self) -> EntityRef {
        self.id.into()
    }

    fn dependencies(&self) -> Vec<EntityRef> {
        let mut deps = vec![self.source.into()];
        if let Destination::Local(to) = self.destination {
            deps.push(to.into());
        }
        deps
    }

    fn snapshot(&self, zone: ZoneId, sequence: u64) -> Vec<Event> {
        let payload = EventPayload::ExitAddToZone(ExitAddToZone {
            exit_id: self.id,
            source: self.source,
            direction: self.direction,
            description: self.description.clone(),
            destination: self.destination,
        });
        vec![Event::new(zone, payload).with_sequence(sequence)]
    }
}

impl Snapshottable for Object {
    fn node(&self) -> EntityRef {
        self.id.into()
    }

    fn dependencies(&self) -> Vec<EntityRef> {
        vec![self.location.into()]
    }

    fn snapshot(&self, zone: ZoneId, sequence: u64) -> Vec<Event> {
        let payload = EventPayload::ObjectAddToZone(ObjectAddToZone {
            object_id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            location_id: self.location,
        });
        vec![Event::new(zone, payload).with_sequence(sequence)]
    }
}

impl Snapshottable for Actor {
    fn node(&self) -> EntityRef {
        self.id.into()
    }

    fn dependencies(&self) -> Vec<EntityRef> {
        vec![self.location.into()]
    }

    fn snapshot(&self, zone: ZoneId, sequence: u64) -> Vec<Event> {
        let payload = EventPayload::ActorAddToZone(ActorAddToZone {
            actor_id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            location_id: self.location,
        });
        vec![Event::new(zone, payload).with_sequence(sequence)]
    }
}

/// Events that rebuild `zone` as of `sequence`
///
/// The caller must hold the zone at exactly that sequence number.
pub fn snapshot_events(zone: &Zone, sequence: u64) -> Vec<Event> {
    let nodes: Vec<&dyn Snapshottable> = zone
        .locations()
        .map(|l| l as &dyn Snapshottable)
        .chain(zone.exits().map(|e| e as &dyn Snapshottable))
        .chain(zone.objects().map(|o| o as &dyn Snapshottable))
        .chain(zone.actors().map(|a| a as &dyn Snapshottable))
        .collect();

    let index: HashMap<EntityRef, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.node(), i))
        .collect();
    let adjacency: Vec<Vec<usize>> = nodes
        .iter()
        .map(|node| {
            node.dependencies()
                .iter()
                .filter_map(|dep| index.get(dep).copied())
                .collect()
        })
        .collect();

    dependency_order(&adjacency)
        .into_iter()
        .flat_map(|i| nodes[i].snapshot(zone.id(), sequence))
        .collect()
}

/// Post-order DFS: every node appears after all nodes it depends on
///
/// Nodes are visited once each; an edge back to a node already on the
/// stack is ignored.
pub(crate) fn dependency_order(adjacency: &[Vec<usize>]) -> Vec<usize> {
    let mut visited = vec![false; adjacency.len()];
    let mut order = Vec::with_capacity(adjacency.len());
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..adjacency.len() {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        stack.push((root, 0));

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            if let Some(&dep) = adjacency[node].get(top.1) {
                top.1 += 1;
                if !visited[dep] {
                    visited[dep] = true;
                    stack.push((dep, 0));
                }
            } else {
                order.push(node);
                stack.pop();
            }
        }
    }
    order
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
