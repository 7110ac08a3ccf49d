// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event store specs
//!
//! Verify the on-disk record format survives a write and a reopen.

use crate::prelude::*;
use crate::prelude::assert_eq;
use std::fs::{File, OpenOptions};
use std::io::Write;
use tw_storage::codec::{read_record, ReadOutcome};
use tw_storage::RECORD_HEADER_LEN;

fn actor_move(zone: ZoneId, sequence: u64) -> (Event, ActorMove) {
    let moved = ActorMove {
        from: LocationId::new_v4(),
        to: LocationId::new_v4(),
        actor_id: ActorId::new_v4(),
    };
    let event = Event::new(zone, EventPayload::ActorMove(moved.clone())).with_sequence(sequence);
    (event, moved)
}

#[test]
fn actor_move_round_trips_with_and_without_compression() {
    for compress in [true, false] {
        let dir = DataDir::new();
        let zone = ZoneId::new_v4();
        let (event, moved) = actor_move(zone, 7);
        dir.store(compress).lock().append(&event).unwrap();

        // Reopen from disk
        let store = dir.store(compress);
        let events = store.lock().read_all().unwrap();
        assert_eq!(events, vec![event.clone()]);
        let EventPayload::ActorMove(ref read) = events[0].payload else {
            panic!("expected an actor move, got {:?}", events[0].payload);
        };
        assert_eq!(read.from_to_actor_ids(), moved.from_to_actor_ids());

        // The header describes the body that follows it
        let mut file = File::open(dir.tmp.path().join("events.dat")).unwrap();
        let ReadOutcome::Record { header, event: raw } = read_record(&mut file).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(header.aggregate_id, zone);
        assert_eq!(header.sequence, 7);
        assert_eq!(header.compressed, compress);
        assert_eq!(header.version, event.version);
        assert_eq!(raw, event);
        assert!(matches!(read_record(&mut file).unwrap(), ReadOutcome::End));
    }
}

#[test]
fn torn_tail_record_is_cut_back_on_open() {
    let dir = DataDir::new();
    let zone = ZoneId::new_v4();
    let (first, _) = actor_move(zone, 1);
    dir.store(true).lock().append(&first).unwrap();
    let path = dir.tmp.path().join("events.dat");
    let intact = std::fs::metadata(&path).unwrap().len();

    {
        let (second, _) = actor_move(zone, 2);
        let record = tw_storage::codec::encode_record(&second, true).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&record[..RECORD_HEADER_LEN + 3]).unwrap();
    }

    let store = dir.store(true);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), intact);
    assert_eq!(store.lock().read_all().unwrap(), vec![first]);

    // Appends continue after the last whole record
    let (third, _) = actor_move(zone, 2);
    store.lock().append(&third).unwrap();
    assert_eq!(store.lock().read_all().unwrap().len(), 2);
}

#[test]
fn zone_retrieval_filters_by_zone_and_ceiling() {
    let dir = DataDir::new();
    let store = dir.store(false);
    let (west, east) = (ZoneId::new_v4(), ZoneId::new_v4());
    for sequence in 1..=3 {
        store.lock().append(&actor_move(west, sequence).0).unwrap();
        store.lock().append(&actor_move(east, sequence).0).unwrap();
    }

    let events = store.lock().events_for_zone(west, 2).unwrap();
    let seen: Vec<_> = events.iter().map(|e| (e.aggregate_id, e.sequence)).collect();
    assert_eq!(seen, vec![(west, 1), (west, 2)]);
}
