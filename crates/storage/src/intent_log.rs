// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-ahead intent log for multi-step operations
//!
//! Each entry is a 32-byte header followed by the redo and undo event lists:
//!
//! | offset | size | field                     |
//! |--------|------|---------------------------|
//! | 0      | 16   | transaction id            |
//! | 16     | 4    | redo length, LE           |
//! | 20     | 4    | undo length, LE           |
//! | 24     | 1    | 1 for a completion marker |
//! | 25     | 7    | padding                   |
//!
//! An intent is written incomplete before the operation runs and a
//! completion marker with empty bodies is appended once it has finished.

use crate::codec::{decode_events, encode_events, read_full, CodecError};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use tw_core::{Event, TransactionId};
use uuid::Uuid;

pub const INTENT_HEADER_LEN: usize = 32;

/// Errors that can occur in intent log operations
#[derive(Debug, Error)]
pub enum IntentLogError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("codec error in intent {id}: {source}")]
    Codec {
        id: TransactionId,
        #[source]
        source: CodecError,
    },
    #[error("intent body of {0} bytes exceeds the entry limit")]
    BodyTooLarge(usize),
    #[error("recovery of intent {id} failed: {source}")]
    Recovery {
        id: TransactionId,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Fixed-size entry header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentHeader {
    pub id: TransactionId,
    pub redo_len: u32,
    pub undo_len: u32,
    pub completed: bool,
}

impl IntentHeader {
    pub fn to_bytes(&self) -> [u8; INTENT_HEADER_LEN] {
        let mut buf = [0u8; INTENT_HEADER_LEN];
        buf[0..16].copy_from_slice(self.id.as_uuid().as_bytes());
        buf[16..20].copy_from_slice(&self.redo_len.to_le_bytes());
        buf[20..24].copy_from_slice(&self.undo_len.to_le_bytes());
        buf[24] = u8::from(self.completed);
        buf
    }

    pub fn from_bytes(buf: &[u8; INTENT_HEADER_LEN]) -> Self {
        let mut id = [0u8; 16];
        id.copy_from_slice(&buf[0..16]);
        let mut redo_len = [0u8; 4];
        redo_len.copy_from_slice(&buf[16..20]);
        let mut undo_len = [0u8; 4];
        undo_len.copy_from_slice(&buf[20..24]);
        Self {
            id: TransactionId(Uuid::from_bytes(id)),
            redo_len: u32::from_le_bytes(redo_len),
            undo_len: u32::from_le_bytes(undo_len),
            completed: buf[24] != 0,
        }
    }

    fn body_len(&self) -> usize {
        self.redo_len as usize + self.undo_len as usize
    }
}

/// An intent that was written but never confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingIntent {
    pub id: TransactionId,
    pub redo: Vec<Event>,
    pub undo: Vec<Event>,
}

/// Durable redo/undo log
///
/// Single writer: the owning process must hold exclusive access to the file.
pub struct IntentLog {
    path: PathBuf,
    file: File,
    len: u64,
}

impl IntentLog {
    /// Open the log and hand every incomplete intent to `handler`
    ///
    /// Intents are recovered in the order they were written. Each one the
    /// handler accepts is confirmed, so a later open does not recover it
    /// again. A handler error stops recovery and is returned.
    pub fn open<F, E>(path: impl Into<PathBuf>, mut handler: F) -> Result<Self, IntentLogError>
    where
        F: FnMut(&PendingIntent) -> Result<(), E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (mut log, pending) = Self::open_pending(path)?;
        for intent in pending {
            handler(&intent).map_err(|e| IntentLogError::Recovery {
                id: intent.id,
                source: e.into(),
            })?;
            log.confirm_completion(intent.id)?;
            info!(id = %intent.id, "recovered intent");
        }
        Ok(log)
    }

    /// Open the log and return incomplete intents without recovering them
    ///
    /// The caller is responsible for confirming each intent it recovers.
    pub fn open_pending(
        path: impl Into<PathBuf>,
    ) -> Result<(Self, Vec<PendingIntent>), IntentLogError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)?;

        let scan = scan(&path)?;
        let file_len = file.metadata()?.len();
        if scan.valid_len < file_len {
            warn!(
                path = %path.display(),
                valid_len = scan.valid_len,
                file_len,
                "truncating partial entry at end of intent log"
            );
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        if !scan.pending.is_empty() {
            info!(
                path = %path.display(),
                pending = scan.pending.len(),
                "intent log has incomplete intents"
            );
        }

        let log = Self {
            path,
            file,
            len: scan.valid_len,
        };
        Ok((log, scan.pending))
    }

    /// Record an intent before running the operation it describes
    pub fn write_intent(
        &mut self,
        redo: &[Event],
        undo: &[Event],
    ) -> Result<TransactionId, IntentLogError> {
        let id = TransactionId(Uuid::new_v4());
        let codec_err = |source| IntentLogError::Codec { id, source };
        let redo_bytes = encode_events(redo).map_err(codec_err)?;
        let undo_bytes = encode_events(undo).map_err(codec_err)?;

        let header = IntentHeader {
            id,
            redo_len: len_u32(redo_bytes.len())?,
            undo_len: len_u32(undo_bytes.len())?,
            completed: false,
        };

        let mut entry = Vec::with_capacity(INTENT_HEADER_LEN + header.body_len());
        entry.extend_from_slice(&header.to_bytes());
        entry.extend_from_slice(&redo_bytes);
        entry.extend_from_slice(&undo_bytes);
        self.append(&entry)?;

        debug!(%id, redo = redo.len(), undo = undo.len(), "intent written");
        Ok(id)
    }

    /// Mark an intent as finished
    pub fn confirm_completion(&mut self, id: TransactionId) -> Result<(), IntentLogError> {
        let marker = IntentHeader {
            id,
            redo_len: 0,
            undo_len: 0,
            completed: true,
        };
        self.append(&marker.to_bytes())?;
        debug!(%id, "intent completed");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length of the valid log
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append and sync one entry; a failed write is cut back to the last
    /// complete entry so later appends stay framed
    fn append(&mut self, bytes: &[u8]) -> Result<(), IntentLogError> {
        let file_len = self.file.metadata()?.len();
        if file_len != self.len {
            warn!(
                path = %self.path.display(),
                valid_len = self.len,
                file_len,
                "cutting torn bytes from end of intent log"
            );
            self.cut_back()?;
        }

        if let Err(e) = self.file.write_all(bytes).and_then(|()| self.file.sync_all()) {
            if let Err(cut) = self.cut_back() {
                error!(
                    path = %self.path.display(),
                    error = %cut,
                    "failed to cut back a torn intent entry"
                );
            }
            return Err(e.into());
        }
        self.len += bytes.len() as u64;
        Ok(())
    }

    fn cut_back(&mut self) -> io::Result<()> {
        self.file.set_len(self.len)?;
        self.file.sync_all()
    }
}

fn len_u32(len: usize) -> Result<u32, IntentLogError> {
    u32::try_from(len).map_err(|_| IntentLogError::BodyTooLarge(len))
}

struct Scan {
    pending: Vec<PendingIntent>,
    valid_len: u64,
}

fn scan(path: &Path) -> Result<Scan, IntentLogError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut pending: HashMap<TransactionId, PendingIntent> = HashMap::new();
    let mut order: Vec<TransactionId> = Vec::new();
    let mut offset = 0u64;

    loop {
        let mut head = [0u8; INTENT_HEADER_LEN];
        let n = read_full(&mut reader, &mut head)?;
        if n == 0 {
            break;
        }
        if n < INTENT_HEADER_LEN {
            debug!(offset, read = n, "partial intent header");
            break;
        }

        let header = IntentHeader::from_bytes(&head);
        let mut body = vec![0u8; header.body_len()];
        let m = read_full(&mut reader, &mut body)?;
        if m < body.len() {
            debug!(offset, id = %header.id, read = m, "partial intent body");
            break;
        }
        offset += (INTENT_HEADER_LEN + body.len()) as u64;

        if header.completed {
            pending.remove(&header.id);
            order.retain(|id| *id != header.id);
            continue;
        }

        let (redo, undo) = body.split_at(header.redo_len as usize);
        let codec_err = |source| IntentLogError::Codec {
            id: header.id,
            source,
        };
        let intent = PendingIntent {
            id: header.id,
            redo: decode_events(redo).map_err(codec_err)?,
            undo: decode_events(undo).map_err(codec_err)?,
        };
        if pending.insert(header.id, intent).is_none() {
            order.push(header.id);
        }
    }

    let pending = order
        .into_iter()
        .filter_map(|id| pending.remove(&id))
        .collect();
    Ok(Scan {
        pending,
        valid_len: offset,
    })
}

#[cfg(test)]
#[path = "intent_log_tests.rs"]
mod tests;
