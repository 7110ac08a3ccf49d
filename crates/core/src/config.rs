// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! World and zone configuration

use crate::id::{LocationId, ZoneId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning for a zone authority loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Pause between scheduling ticks
    #[serde(with = "humantime_serde")]
    pub tick: Duration,
    /// Capacity of each entity's request channel
    pub lane_capacity: usize,
    /// Capacity of each observer's notification queue
    pub observer_capacity: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(5),
            lane_capacity: 64,
            observer_capacity: 256,
        }
    }
}

/// Where new actors enter the world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontDoor {
    pub zone: ZoneId,
    pub location: LocationId,
}

/// Configuration consumed by the world on startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Zones loaded from the event store at startup
    #[serde(default)]
    pub zones: Vec<ZoneId>,
    pub front_door: FrontDoor,
    #[serde(default)]
    pub zone: ZoneConfig,
}

impl WorldConfig {
    pub fn new(front_door: FrontDoor) -> Self {
        Self {
            zones: vec![front_door.zone],
            front_door,
            zone: ZoneConfig::default(),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
