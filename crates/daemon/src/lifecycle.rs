// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, bootstrap.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use thiserror::Error;
use tracing::{info, warn};
use tw_core::{FrontDoor, LocationAddToZone, LocationId, UuidIdGen, WorldConfig, ZoneId};
use tw_engine::{World, WorldError, WorldHandle, WorldStorage, Zone, ZoneError};
use tw_storage::{EventStore, SharedEventStore, StoreError};

use crate::config::{Config, ConfigError, DEFAULT_CONFIG_FILE};

const FRONT_DOOR_TITLE: &str = "Front Door";
const FRONT_DOOR_DESCRIPTION: &str = "A plain room. Everything starts here.";

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Already initialized: {0} exists")]
    AlreadyInitialized(PathBuf),

    #[error("Log path has no parent directory: {0}")]
    NoLogDir(PathBuf),

    #[error("Event store error: {0}")]
    Store(#[from] StoreError),

    #[error("World error: {0}")]
    World(#[from] WorldError),

    #[error("Zone error: {0}")]
    Zone(#[from] ZoneError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running world plus the lock that makes this process its only owner
pub struct Daemon {
    pub config: Config,
    pub world: WorldHandle,
    pub start_time: Instant,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    lock_file: File,
}

impl Daemon {
    /// Snapshot every zone, logging what was written
    pub async fn snapshot(&self) -> Result<Vec<(ZoneId, u64)>, LifecycleError> {
        let written = self.world.snapshot().await?;
        info!(zones = written.len(), "periodic snapshot complete");
        Ok(written)
    }

    /// Stop the world and release the data directory
    ///
    /// Returns the stopped zones.
    pub async fn shutdown(self) -> Result<Vec<Zone>, LifecycleError> {
        info!("Shutting down daemon...");
        let zones = self.world.stop().await?;

        if let Err(e) = FileExt::unlock(&self.lock_file) {
            warn!("Failed to release lock: {}", e);
        }
        if let Err(e) = std::fs::remove_file(self.config.lock_path()) {
            warn!("Failed to remove lock file: {}", e);
        }

        info!(
            zones = zones.len(),
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        Ok(zones)
    }
}

/// Start the daemon
///
/// The lock is taken first; a second daemon on the same data directory fails
/// here without touching anything.
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.data_dir)?;
    let lock_file = acquire_lock(&config.lock_path())?;

    match startup_inner(config).await {
        Ok(world) => Ok(Daemon {
            config: config.clone(),
            world,
            start_time: Instant::now(),
            lock_file,
        }),
        Err(e) => {
            cleanup_on_failure(config, &lock_file);
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<WorldHandle, LifecycleError> {
    let store = open_store(config)?;
    info!(
        records = store.lock().record_count(),
        path = %config.events_path().display(),
        "event store opened"
    );

    let storage = WorldStorage::new(store, config.intent_path());
    let world = World::load_and_start(config.world.clone(), storage, UuidIdGen).await?;

    info!(
        zones = config.world.zones.len(),
        front_door = %config.world.front_door.location,
        "World started from {}",
        config.data_dir.display()
    );
    Ok(world)
}

fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    use std::io::Write;

    let mut lock_file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    // Write PID to lock file
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Release resources taken before a failed startup
fn cleanup_on_failure(config: &Config, lock_file: &File) {
    let _ = FileExt::unlock(lock_file);
    let lock_path = config.lock_path();
    if lock_path.exists() {
        let _ = std::fs::remove_file(&lock_path);
    }
}

fn open_store(config: &Config) -> Result<SharedEventStore, LifecycleError> {
    let store = EventStore::open(
        config.events_path(),
        config.snapshot_dir(),
        config.compress_events,
    )?;
    Ok(SharedEventStore::new(store))
}

/// Bootstrap a data directory with a one-room world
///
/// The room is added through a running zone so it lands in the event log the
/// same way live changes do. The config file defaults to
/// `<data_dir>/twd.toml`; it is never overwritten.
pub async fn init(
    data_dir: &Path,
    config_path: Option<&Path>,
) -> Result<(Config, PathBuf), LifecycleError> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(DEFAULT_CONFIG_FILE));
    if config_path.exists() {
        return Err(LifecycleError::AlreadyInitialized(config_path));
    }

    std::fs::create_dir_all(data_dir)?;
    let data_dir = data_dir.canonicalize()?;
    let front_door = FrontDoor {
        zone: ZoneId::new_v4(),
        location: LocationId::new_v4(),
    };
    let config = Config::new(&data_dir, WorldConfig::new(front_door));
    if config.events_path().exists() {
        return Err(LifecycleError::AlreadyInitialized(config.events_path()));
    }

    let store = open_store(&config)?;
    let zone = Zone::new(
        front_door.zone,
        Some(Arc::new(store)),
        config.world.zone.clone(),
    )
    .start();
    let created = zone
        .add_location(LocationAddToZone {
            location_id: front_door.location,
            title: FRONT_DOOR_TITLE.to_string(),
            description: FRONT_DOOR_DESCRIPTION.to_string(),
        })
        .await;
    // Stop the zone before reporting, whatever the outcome
    let stopped = zone.shutdown().await;
    created?;
    stopped?;

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    config.save(&config_path)?;

    info!(
        zone = %front_door.zone,
        location = %front_door.location,
        "initialized world in {}",
        data_dir.display()
    );
    Ok((config, config_path))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
