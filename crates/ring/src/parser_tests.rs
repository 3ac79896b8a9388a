// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::packet::encode;

#[test]
fn single_frame_in_one_chunk() {
    let frame = encode("term-1", b"hello").unwrap();
    let mut parser = Parser::new();
    let events = parser.feed(&frame);
    assert_eq!(
        events,
        vec![ParseEvent::Packet(Packet { identifier: "term-1".into(), payload: b"hello".to_vec() })]
    );
}

#[test]
fn frame_split_byte_by_byte() {
    let frame = encode("a", b"payload-data").unwrap();
    let mut parser = Parser::new();
    let mut events = Vec::new();
    for b in &frame {
        events.extend(parser.feed(std::slice::from_ref(b)));
    }
    assert_eq!(
        events,
        vec![ParseEvent::Packet(Packet { identifier: "a".into(), payload: b"payload-data".to_vec() })]
    );
}

#[test]
fn multiple_frames_in_one_chunk() {
    let mut buf = encode("x", b"one").unwrap();
    buf.extend(encode("y", b"two").unwrap());
    let mut parser = Parser::new();
    let events = parser.feed(&buf);
    assert_eq!(
        events,
        vec![
            ParseEvent::Packet(Packet { identifier: "x".into(), payload: b"one".to_vec() }),
            ParseEvent::Packet(Packet { identifier: "y".into(), payload: b"two".to_vec() }),
        ]
    );
}

#[test]
fn zero_identifier_length_triggers_reset() {
    let mut parser = Parser::new();
    let events = parser.feed(&[0u8]);
    assert_eq!(events, vec![ParseEvent::Reset]);
}

#[test]
fn reset_drops_carry_over_and_does_not_resync() {
    let mut parser = Parser::new();
    // Corrupt header, followed by a well-formed frame in the same chunk.
    // The corrupt byte poisons the whole pending carry-over: the
    // well-formed frame bytes are dropped along with it, not resynced.
    let mut buf = vec![0u8];
    buf.extend(encode("ok", b"data").unwrap());
    let events = parser.feed(&buf);
    assert_eq!(events, vec![ParseEvent::Reset]);

    // The parser is ready for a fresh stream after the reset.
    let frame = encode("next", b"fine").unwrap();
    let events = parser.feed(&frame);
    assert_eq!(
        events,
        vec![ParseEvent::Packet(Packet { identifier: "next".into(), payload: b"fine".to_vec() })]
    );
}

#[test]
fn empty_payload_frame_round_trips() {
    let frame = encode("empty", b"").unwrap();
    let mut parser = Parser::new();
    let events = parser.feed(&frame);
    assert_eq!(
        events,
        vec![ParseEvent::Packet(Packet { identifier: "empty".into(), payload: vec![] })]
    );
}

#[test]
fn chunked_across_wrap_boundary_reassembles() {
    let payload = vec![7u8; 5000];
    let frame = encode("big", &payload).unwrap();

    // Simulate arbitrary chunking: header+id in one piece, length split,
    // payload split into uneven pieces.
    let mut parser = Parser::new();
    let mut events = Vec::new();
    let chunks = [&frame[..3], &frame[3..5], &frame[5..1000], &frame[1000..]];
    for c in chunks {
        events.extend(parser.feed(c));
    }
    assert_eq!(
        events,
        vec![ParseEvent::Packet(Packet { identifier: "big".into(), payload })]
    );
}
