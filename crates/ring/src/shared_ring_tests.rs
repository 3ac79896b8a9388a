// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn rejects_non_power_of_two_capacity() {
    assert_eq!(RingBuffer::new(0).unwrap_err(), RingError::CapacityNotPowerOfTwo);
    assert_eq!(RingBuffer::new(6).unwrap_err(), RingError::CapacityNotPowerOfTwo);
}

#[test]
fn write_never_partial() {
    let mut ring = RingBuffer::new(8).unwrap();
    assert_eq!(ring.write(b"abcd"), 4);
    // Only 4 bytes free; a 5-byte write must fail entirely, not partially.
    assert_eq!(ring.write(b"efghi"), 0);
    assert_eq!(ring.len(), 4);
}

#[test]
fn sequential_write_and_read() {
    let mut ring = RingBuffer::new(16).unwrap();
    ring.write(b"hello");
    ring.write(b" world");
    assert_eq!(ring.read(), b"hello world".to_vec());
    assert!(ring.is_empty());
}

#[test]
fn read_up_to_reconstructs_stream() {
    let mut ring = RingBuffer::new(2048).unwrap();
    let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
    ring.write(&data);

    let mut out = Vec::new();
    for _ in 0..10 {
        out.extend(ring.read_up_to(100).unwrap());
    }
    assert_eq!(out, data);
    assert!(ring.is_empty());
}

#[test]
fn read_up_to_zero_rejected() {
    let mut ring = RingBuffer::new(16).unwrap();
    ring.write(b"x");
    assert_eq!(ring.read_up_to(0).unwrap_err(), RingError::ZeroMaxRead);
}

#[test]
fn wrap_around_roundtrip() {
    let mut ring = RingBuffer::new(8).unwrap();
    ring.write(b"abcdef"); // write_pos = 6
    assert_eq!(ring.read_up_to(4).unwrap(), b"abcd".to_vec()); // read_pos = 4
    ring.write(b"ghij"); // wraps: occupies [6..8] then [0..2]
    assert_eq!(ring.read(), b"efghij".to_vec());
}

#[test]
fn utilization_tracks_fill_level() {
    let mut ring = RingBuffer::new(100.next_power_of_two()).unwrap();
    let cap = ring.capacity();
    ring.write(&vec![0u8; cap / 2]);
    assert_eq!(ring.utilization(), 50);
}

#[test]
fn reset_clears_and_bumps_epoch() {
    let mut ring = RingBuffer::new(16).unwrap();
    ring.write(b"data");
    assert_eq!(ring.epoch(), 0);
    ring.reset();
    assert_eq!(ring.epoch(), 1);
    assert!(ring.is_empty());
}

proptest::proptest! {
    #[test]
    fn chunked_reads_always_equal_original(chunk_sizes in proptest::collection::vec(1usize..50, 1..30)) {
        let mut ring = RingBuffer::new(4096).unwrap();
        let total: usize = chunk_sizes.iter().sum::<usize>().min(4096);
        let data: Vec<u8> = (0..total as u32).map(|i| (i % 256) as u8).collect();
        ring.write(&data);

        let mut out = Vec::new();
        for sz in &chunk_sizes {
            let chunk = ring.read_up_to(*sz).unwrap();
            if chunk.is_empty() {
                break;
            }
            out.extend(chunk);
        }
        proptest::prop_assert_eq!(out, data);
    }
}
