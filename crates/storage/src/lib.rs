// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tw-storage: durable event log, snapshots and intent log

pub mod codec;
mod event_store;
mod intent_log;

pub use codec::{CodecError, ReadOutcome, RecordHeader, RECORD_HEADER_LEN};
pub use event_store::{EventStore, SharedEventStore, StoreError};
pub use intent_log::{
    IntentHeader, IntentLog, IntentLogError, PendingIntent, INTENT_HEADER_LEN,
};
