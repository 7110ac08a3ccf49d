// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence seam between zones and durable storage

use crate::event::Event;
use crate::id::ZoneId;
use thiserror::Error;

/// Error returned when an event could not be made durable
#[derive(Debug, Error)]
#[error("failed to persist event {sequence} of zone {zone}: {source}")]
pub struct PersistError {
    pub zone: ZoneId,
    pub sequence: u64,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl PersistError {
    pub fn new(
        event: &Event,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            zone: event.aggregate_id,
            sequence: event.sequence,
            source: source.into(),
        }
    }
}

/// Durably records events applied by a zone
pub trait Persister: Send + Sync {
    fn persist(&self, event: &Event) -> Result<(), PersistError>;
}
