// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Intent log specs
//!
//! Verify recovery runs exactly once per unconfirmed intent and that torn
//! entries are cut away.

use crate::prelude::*;
use crate::prelude::assert_eq;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tw_core::{ActorRemoveFromZone, TransactionId};
use tw_storage::{IntentHeader, INTENT_HEADER_LEN};

fn departure() -> Event {
    Event::new(
        ZoneId::new_v4(),
        EventPayload::ActorRemoveFromZone(ActorRemoveFromZone {
            actor_id: ActorId::new_v4(),
        }),
    )
}

/// Open the log and count how many times recovery is invoked
fn recoveries(path: &Path) -> usize {
    let mut calls = 0;
    IntentLog::open(path, |_| {
        calls += 1;
        Ok::<(), std::io::Error>(())
    })
    .unwrap();
    calls
}

#[test]
fn confirmed_intent_is_never_recovered() {
    let dir = DataDir::new();
    {
        let (mut log, _) = IntentLog::open_pending(dir.intent_path()).unwrap();
        let id = log.write_intent(&[departure()], &[]).unwrap();
        log.confirm_completion(id).unwrap();
    }

    assert_eq!(recoveries(&dir.intent_path()), 0);
}

#[test]
fn unconfirmed_intent_is_recovered_exactly_once() {
    let dir = DataDir::new();
    let redo = vec![departure(), departure()];
    let undo = vec![departure()];
    {
        let (mut log, _) = IntentLog::open_pending(dir.intent_path()).unwrap();
        log.write_intent(&redo, &undo).unwrap();
    }

    let mut seen = Vec::new();
    IntentLog::open(dir.intent_path(), |intent| {
        seen.push((intent.redo.clone(), intent.undo.clone()));
        Ok::<(), std::io::Error>(())
    })
    .unwrap();
    assert_eq!(seen, vec![(redo, undo)]);

    assert_eq!(recoveries(&dir.intent_path()), 0);
}

#[test]
fn header_without_body_is_truncated_on_open() {
    let dir = DataDir::new();
    let path = dir.intent_path();
    {
        let (mut log, _) = IntentLog::open_pending(&path).unwrap();
        let id = log.write_intent(&[departure()], &[]).unwrap();
        log.confirm_completion(id).unwrap();
    }
    let before = std::fs::metadata(&path).unwrap().len();

    let header = IntentHeader {
        id: TransactionId::new_v4(),
        redo_len: 64,
        undo_len: 0,
        completed: false,
    };
    OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap()
        .write_all(&header.to_bytes())
        .unwrap();
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        before + INTENT_HEADER_LEN as u64
    );

    assert_eq!(recoveries(&path), 0);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), before);
}
