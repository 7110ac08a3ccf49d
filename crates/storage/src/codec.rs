// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binary record framing for events
//!
//! Each record is a fixed 33-byte header followed by a JSON body:
//!
//! | offset | size | field                       |
//! |--------|------|-----------------------------|
//! | 0      | 16   | aggregate (zone) id         |
//! | 16     | 8    | sequence number, LE         |
//! | 24     | 4    | body length, LE             |
//! | 28     | 2    | event type code, LE         |
//! | 30     | 2    | event version, LE           |
//! | 32     | 1    | 1 if the body is deflated   |

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};
use thiserror::Error;
use tw_core::{Event, EventPayload, EventType, ZoneId, EVENT_VERSION};
use uuid::Uuid;

pub const RECORD_HEADER_LEN: usize = 33;

/// Errors that can occur while encoding or decoding records
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown event type code {0}")]
    UnknownEventType(u16),
    #[error("unsupported version {version} for event type {code}")]
    UnsupportedVersion { code: u16, version: u16 },
    #[error("event body of {0} bytes exceeds the record limit")]
    BodyTooLarge(usize),
    #[error("record truncated after {0} bytes")]
    Truncated(usize),
}

/// Fixed-size record header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub aggregate_id: ZoneId,
    pub sequence: u64,
    pub body_len: u32,
    pub event_type: u16,
    pub version: u16,
    pub compressed: bool,
}

impl RecordHeader {
    pub fn to_bytes(&self) -> [u8; RECORD_HEADER_LEN] {
        let mut buf = [0u8; RECORD_HEADER_LEN];
        buf[0..16].copy_from_slice(self.aggregate_id.as_uuid().as_bytes());
        buf[16..24].copy_from_slice(&self.sequence.to_le_bytes());
        buf[24..28].copy_from_slice(&self.body_len.to_le_bytes());
        buf[28..30].copy_from_slice(&self.event_type.to_le_bytes());
        buf[30..32].copy_from_slice(&self.version.to_le_bytes());
        buf[32] = u8::from(self.compressed);
        buf
    }

    pub fn from_bytes(buf: &[u8; RECORD_HEADER_LEN]) -> Self {
        let mut id = [0u8; 16];
        id.copy_from_slice(&buf[0..16]);
        let mut sequence = [0u8; 8];
        sequence.copy_from_slice(&buf[16..24]);
        let mut body_len = [0u8; 4];
        body_len.copy_from_slice(&buf[24..28]);
        let mut event_type = [0u8; 2];
        event_type.copy_from_slice(&buf[28..30]);
        let mut version = [0u8; 2];
        version.copy_from_slice(&buf[30..32]);
        Self {
            aggregate_id: ZoneId(Uuid::from_bytes(id)),
            sequence: u64::from_le_bytes(sequence),
            body_len: u32::from_le_bytes(body_len),
            event_type: u16::from_le_bytes(event_type),
            version: u16::from_le_bytes(version),
            compressed: buf[32] != 0,
        }
    }
}

/// Result of reading one record from a stream
#[derive(Debug)]
pub enum ReadOutcome {
    Record {
        header: RecordHeader,
        event: Event,
    },
    /// Clean end of stream: no bytes were available
    End,
    /// The stream ended partway through a record
    Truncated { read: usize },
}

/// Encode an event into a complete record
pub fn encode_record(event: &Event, compress: bool) -> Result<Vec<u8>, CodecError> {
    let json = event.payload.encode_body()?;
    let body = if compress {
        let mut encoder = DeflateEncoder::new(Vec::with_capacity(json.len()), Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?
    } else {
        json
    };
    let body_len = u32::try_from(body.len()).map_err(|_| CodecError::BodyTooLarge(body.len()))?;

    let header = RecordHeader {
        aggregate_id: event.aggregate_id,
        sequence: event.sequence,
        body_len,
        event_type: event.event_type().code(),
        version: event.version,
        compressed: compress,
    };

    let mut record = Vec::with_capacity(RECORD_HEADER_LEN + body.len());
    record.extend_from_slice(&header.to_bytes());
    record.extend_from_slice(&body);
    Ok(record)
}

/// Write one record, returning the number of bytes written
pub fn write_record<W: Write>(
    writer: &mut W,
    event: &Event,
    compress: bool,
) -> Result<usize, CodecError> {
    let record = encode_record(event, compress)?;
    writer.write_all(&record)?;
    Ok(record.len())
}

/// Read one record
///
/// Corrupt content (bad JSON, unknown type, newer version) is an error; a
/// short read is reported as [`ReadOutcome::Truncated`] so callers can decide
/// whether to cut the stream back.
pub fn read_record<R: Read>(reader: &mut R) -> Result<ReadOutcome, CodecError> {
    let mut head = [0u8; RECORD_HEADER_LEN];
    let n = read_full(reader, &mut head)?;
    if n == 0 {
        return Ok(ReadOutcome::End);
    }
    if n < RECORD_HEADER_LEN {
        return Ok(ReadOutcome::Truncated { read: n });
    }

    let header = RecordHeader::from_bytes(&head);
    let mut body = vec![0u8; header.body_len as usize];
    let m = read_full(reader, &mut body)?;
    if m < body.len() {
        return Ok(ReadOutcome::Truncated {
            read: RECORD_HEADER_LEN + m,
        });
    }

    let event = decode_event(&header, &body)?;
    Ok(ReadOutcome::Record { header, event })
}

/// Build an event from a header and its raw body
pub fn decode_event(header: &RecordHeader, body: &[u8]) -> Result<Event, CodecError> {
    let ty = EventType::from_code(header.event_type)
        .ok_or(CodecError::UnknownEventType(header.event_type))?;
    if header.version > EVENT_VERSION {
        return Err(CodecError::UnsupportedVersion {
            code: header.event_type,
            version: header.version,
        });
    }

    let payload = if header.compressed {
        let mut json = Vec::new();
        DeflateDecoder::new(body).read_to_end(&mut json)?;
        EventPayload::decode_body(ty, &json)?
    } else {
        EventPayload::decode_body(ty, body)?
    };

    Ok(Event {
        aggregate_id: header.aggregate_id,
        sequence: header.sequence,
        version: header.version,
        payload,
    })
}

/// Encode a list of events as consecutive uncompressed records
pub fn encode_events(events: &[Event]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    for event in events {
        write_record(&mut out, event, false)?;
    }
    Ok(out)
}

/// Decode a buffer produced by [`encode_events`]; any truncation is an error
pub fn decode_events(mut bytes: &[u8]) -> Result<Vec<Event>, CodecError> {
    let mut events = Vec::new();
    let mut offset = 0usize;
    loop {
        match read_record(&mut bytes)? {
            ReadOutcome::Record { header, event } => {
                offset += RECORD_HEADER_LEN + header.body_len as usize;
                events.push(event);
            }
            ReadOutcome::End => return Ok(events),
            ReadOutcome::Truncated { read } => return Err(CodecError::Truncated(offset + read)),
        }
    }
}

/// Fill `buf` as far as the reader allows, returning bytes read
pub(crate) fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
