// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Cursor;
use tw_core::{ActorId, ActorMove, LocationAddToZone, LocationId};

fn actor_move() -> Event {
    Event::new(
        ZoneId(Uuid::new_v4()),
        EventPayload::ActorMove(ActorMove {
            from: LocationId(Uuid::new_v4()),
            to: LocationId(Uuid::new_v4()),
            actor_id: ActorId(Uuid::new_v4()),
        }),
    )
    .with_sequence(42)
}

fn read_one(bytes: &[u8]) -> (RecordHeader, Event) {
    match read_record(&mut Cursor::new(bytes)).unwrap() {
        ReadOutcome::Record { header, event } => (header, event),
        other => panic!("expected a record, got {:?}", other),
    }
}

#[test]
fn compressed_actor_move_roundtrip() {
    let event = actor_move();
    let EventPayload::ActorMove(original) = &event.payload else {
        unreachable!()
    };

    let bytes = encode_record(&event, true).unwrap();
    let (header, decoded) = read_one(&bytes);

    assert!(header.compressed);
    assert_eq!(header.sequence, 42);
    assert_eq!(header.aggregate_id, event.aggregate_id);
    assert_eq!(header.event_type, EventType::ActorMove.code());
    assert_eq!(header.body_len as usize, bytes.len() - RECORD_HEADER_LEN);
    assert_eq!(decoded, event);

    let EventPayload::ActorMove(mv) = decoded.payload else {
        panic!("wrong payload type");
    };
    assert_eq!(mv.from_to_actor_ids(), original.from_to_actor_ids());
}

#[test]
fn uncompressed_body_is_plain_json() {
    let event = actor_move();
    let bytes = encode_record(&event, false).unwrap();
    let (header, decoded) = read_one(&bytes);

    assert!(!header.compressed);
    assert_eq!(bytes[RECORD_HEADER_LEN], b'{');
    assert_eq!(decoded, event);
}

#[test]
fn header_layout_is_little_endian() {
    let header = RecordHeader {
        aggregate_id: ZoneId(Uuid::from_u64_pair(1, 2)),
        sequence: 0x0102,
        body_len: 7,
        event_type: 10,
        version: 1,
        compressed: true,
    };
    let bytes = header.to_bytes();
    assert_eq!(bytes.len(), 33);
    assert_eq!(&bytes[16..18], &[0x02, 0x01]);
    assert_eq!(bytes[24], 7);
    assert_eq!(bytes[28], 10);
    assert_eq!(bytes[30], 1);
    assert_eq!(bytes[32], 1);
    assert_eq!(RecordHeader::from_bytes(&bytes), header);
}

#[test]
fn empty_stream_is_a_clean_end() {
    let outcome = read_record(&mut Cursor::new(Vec::<u8>::new())).unwrap();
    assert!(matches!(outcome, ReadOutcome::End));
}

#[test]
fn short_header_is_truncation() {
    let bytes = encode_record(&actor_move(), false).unwrap();
    let outcome = read_record(&mut Cursor::new(&bytes[..10])).unwrap();
    assert!(matches!(outcome, ReadOutcome::Truncated { read: 10 }));
}

#[test]
fn short_body_is_truncation() {
    let bytes = encode_record(&actor_move(), false).unwrap();
    let cut = bytes.len() - 3;
    let outcome = read_record(&mut Cursor::new(&bytes[..cut])).unwrap();
    assert!(matches!(outcome, ReadOutcome::Truncated { read } if read == cut));
}

#[test]
fn unknown_type_code_is_an_error() {
    let mut bytes = encode_record(&actor_move(), false).unwrap();
    bytes[28] = 99;
    let err = read_record(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, CodecError::UnknownEventType(99)));
}

#[test]
fn newer_version_is_rejected() {
    let mut bytes = encode_record(&actor_move(), false).unwrap();
    bytes[30] = 2;
    let err = read_record(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, CodecError::UnsupportedVersion { version: 2, .. }));
}

#[test]
fn event_lists_decode_in_order() {
    let zone = ZoneId(Uuid::new_v4());
    let events: Vec<Event> = (1..=3)
        .map(|n| {
            Event::new(
                zone,
                EventPayload::LocationAddToZone(LocationAddToZone {
                    location_id: LocationId(Uuid::from_u64_pair(0, n)),
                    title: format!("room {n}"),
                    description: String::new(),
                }),
            )
        })
        .collect();

    let bytes = encode_events(&events).unwrap();
    assert_eq!(decode_events(&bytes).unwrap(), events);
    assert!(decode_events(&[]).unwrap().is_empty());

    let err = decode_events(&bytes[..bytes.len() - 1]).unwrap_err();
    assert!(matches!(err, CodecError::Truncated(_)));
}
