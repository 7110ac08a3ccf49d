// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event store with per-zone snapshot files

use crate::codec::{encode_record, read_record, CodecError, ReadOutcome, RECORD_HEADER_LEN};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tw_core::{Event, PersistError, Persister, ZoneId};
use uuid::Uuid;

const SNAPSHOT_EXTENSION: &str = "dat";

/// Errors that can occur in event store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("corrupt record at offset {offset} in {path}: {source}")]
    Corrupt {
        path: PathBuf,
        offset: u64,
        #[source]
        source: CodecError,
    },
}

/// Append-only log of serialized events
pub struct EventStore {
    log_path: PathBuf,
    snapshot_dir: PathBuf,
    compress: bool,
    file: File,
    len: u64,
    records: u64,
}

impl EventStore {
    /// Open or create the store
    ///
    /// A partially written record at the end of the log is cut away before
    /// the store accepts new appends.
    pub fn open(
        log_path: impl Into<PathBuf>,
        snapshot_dir: impl Into<PathBuf>,
        compress: bool,
    ) -> Result<Self, StoreError> {
        let log_path = log_path.into();
        let snapshot_dir = snapshot_dir.into();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&snapshot_dir)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&log_path)?;

        let scan = scan(&log_path, |_| true)?;
        let file_len = file.metadata()?.len();
        if scan.valid_len < file_len {
            warn!(
                path = %log_path.display(),
                valid_len = scan.valid_len,
                file_len,
                "truncating partial record at end of event log"
            );
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        info!(
            path = %log_path.display(),
            records = scan.events.len(),
            "opened event store"
        );

        Ok(Self {
            records: scan.events.len() as u64,
            len: scan.valid_len,
            log_path,
            snapshot_dir,
            compress,
            file,
        })
    }

    /// Append one event and sync it to disk
    ///
    /// A failed write is cut back to the last complete record before the
    /// error is returned, so later appends stay framed.
    pub fn append(&mut self, event: &Event) -> Result<(), StoreError> {
        let record = encode_record(event, self.compress)?;
        self.cut_torn_tail()?;
        if let Err(e) = self
            .file
            .write_all(&record)
            .and_then(|()| self.file.sync_data())
        {
            if let Err(cut) = self.cut_back() {
                error!(
                    path = %self.log_path.display(),
                    error = %cut,
                    "failed to cut back a torn append"
                );
            }
            return Err(e.into());
        }
        self.len += record.len() as u64;
        self.records += 1;
        debug!(
            zone = %event.aggregate_id,
            sequence = event.sequence,
            name = event.name(),
            "event appended"
        );
        Ok(())
    }

    /// Drop bytes past the last complete record left by an earlier failure
    fn cut_torn_tail(&mut self) -> io::Result<()> {
        let file_len = self.file.metadata()?.len();
        if file_len != self.len {
            warn!(
                path = %self.log_path.display(),
                valid_len = self.len,
                file_len,
                "cutting torn bytes from end of event log"
            );
            self.cut_back()?;
        }
        Ok(())
    }

    fn cut_back(&mut self) -> io::Result<()> {
        self.file.set_len(self.len)?;
        self.file.sync_all()
    }

    /// Read every event in the log, in write order
    pub fn read_all(&self) -> Result<Vec<Event>, StoreError> {
        Ok(scan(&self.log_path, |_| true)?.events)
    }

    /// Events needed to rebuild `zone` up to and including `ceiling`
    ///
    /// Uses the newest snapshot not beyond the ceiling, followed by the logged
    /// events after it; falls back to the whole log when no snapshot exists.
    pub fn events_for_zone(&self, zone: ZoneId, ceiling: u64) -> Result<Vec<Event>, StoreError> {
        let (floor, mut events) = match self.latest_snapshot(zone, ceiling)? {
            Some((sequence, path)) => {
                debug!(%zone, sequence, "replaying from snapshot");
                (sequence, scan(&path, |_| true)?.events)
            }
            None => (0, Vec::new()),
        };

        let tail = scan(&self.log_path, |e| {
            e.aggregate_id == zone && e.sequence > floor && e.sequence <= ceiling
        })?;
        events.extend(tail.events);
        Ok(events)
    }

    /// Newest snapshot for `zone` whose sequence does not exceed `ceiling`
    pub fn latest_snapshot(
        &self,
        zone: ZoneId,
        ceiling: u64,
    ) -> Result<Option<(u64, PathBuf)>, StoreError> {
        let entries = match fs::read_dir(&self.snapshot_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut best: Option<(u64, PathBuf)> = None;
        for entry in entries {
            let path = entry?.path();
            let Some((id, sequence)) = parse_snapshot_name(&path) else {
                continue;
            };
            if id != zone || sequence > ceiling {
                continue;
            }
            if best.as_ref().map_or(true, |(seen, _)| sequence > *seen) {
                best = Some((sequence, path));
            }
        }
        Ok(best)
    }

    /// Write a snapshot artifact for `zone` at `sequence`
    ///
    /// The file is written under a temporary name and renamed into place, so a
    /// crash never leaves a half-written snapshot under its final name.
    pub fn write_snapshot(
        &self,
        zone: ZoneId,
        sequence: u64,
        events: &[Event],
    ) -> Result<PathBuf, StoreError> {
        fs::create_dir_all(&self.snapshot_dir)?;
        let path = self.snapshot_path(zone, sequence);
        let tmp = path.with_extension("tmp");

        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            for event in events {
                writer.write_all(&encode_record(event, self.compress)?)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        info!(%zone, sequence, events = events.len(), "snapshot written");
        Ok(path)
    }

    pub fn snapshot_path(&self, zone: ZoneId, sequence: u64) -> PathBuf {
        self.snapshot_dir
            .join(format!("{}_{}.{}", zone, sequence, SNAPSHOT_EXTENSION))
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }

    /// Number of records in the log
    pub fn record_count(&self) -> u64 {
        self.records
    }

    /// Byte length of the valid log
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Event store shared between zones and the world
#[derive(Clone)]
pub struct SharedEventStore(Arc<Mutex<EventStore>>);

impl SharedEventStore {
    pub fn new(store: EventStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> MutexGuard<'_, EventStore> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Persister for SharedEventStore {
    fn persist(&self, event: &Event) -> Result<(), PersistError> {
        self.lock()
            .append(event)
            .map_err(|e| PersistError::new(event, e))
    }
}

struct Scan {
    events: Vec<Event>,
    valid_len: u64,
}

/// Sequentially read a record file, keeping events accepted by `filter`
fn scan(path: &Path, filter: impl Fn(&Event) -> bool) -> Result<Scan, StoreError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok(Scan {
                events: Vec::new(),
                valid_len: 0,
            })
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut events = Vec::new();
    let mut offset = 0u64;
    loop {
        let outcome = read_record(&mut reader).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            offset,
            source,
        })?;
        match outcome {
            ReadOutcome::Record { header, event } => {
                offset += (RECORD_HEADER_LEN + header.body_len as usize) as u64;
                if filter(&event) {
                    events.push(event);
                }
            }
            ReadOutcome::End => break,
            ReadOutcome::Truncated { read } => {
                debug!(path = %path.display(), offset, read, "partial record at end of file");
                break;
            }
        }
    }

    Ok(Scan {
        events,
        valid_len: offset,
    })
}

/// Parse `<zone>_<sequence>.dat`
fn parse_snapshot_name(path: &Path) -> Option<(ZoneId, u64)> {
    if path.extension()? != SNAPSHOT_EXTENSION {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (zone, sequence) = stem.rsplit_once('_')?;
    let zone = Uuid::parse_str(zone).ok()?;
    let sequence = sequence.parse().ok()?;
    Some((ZoneId(zone), sequence))
}

#[cfg(test)]
#[path = "event_store_tests.rs"]
mod tests;
