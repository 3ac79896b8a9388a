// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn collect(ring: &Scrollback, offset: u64) -> Option<Vec<u8>> {
    ring.read_from(offset).map(|(a, b)| {
        let mut v = a.to_vec();
        v.extend_from_slice(b);
        v
    })
}

#[test]
fn empty_read() {
    let ring = Scrollback::new(16);
    assert_eq!(collect(&ring, 0), Some(vec![]));
}

#[test]
fn sequential_writes() {
    let mut ring = Scrollback::new(16);
    ring.write(b"hello");
    ring.write(b" world");

    assert_eq!(collect(&ring, 0), Some(b"hello world".to_vec()));
    assert_eq!(collect(&ring, 5), Some(b" world".to_vec()));
    assert_eq!(ring.total_written(), 11);
}

#[test]
fn wrap_around_discards_oldest() {
    let mut ring = Scrollback::new(8);
    ring.write(b"abcdef");
    ring.write(b"ghij");

    assert_eq!(collect(&ring, 0), None);
    assert_eq!(collect(&ring, 2), Some(b"cdefghij".to_vec()));
}

#[test]
fn offset_too_new_returns_none() {
    let mut ring = Scrollback::new(16);
    ring.write(b"abc");
    assert_eq!(collect(&ring, 4), None);
}

#[test]
fn last_lines_returns_tail() {
    let mut ring = Scrollback::new(256);
    ring.write(b"one\ntwo\nthree\nfour\n");
    assert_eq!(ring.last_lines(2), vec!["three".to_owned(), "four".to_owned()]);
}

#[test]
fn last_lines_zero_is_empty() {
    let ring = Scrollback::new(256);
    assert!(ring.last_lines(0).is_empty());
}

#[test]
fn last_lines_more_than_available_returns_all() {
    let mut ring = Scrollback::new(256);
    ring.write(b"a\nb\n");
    assert_eq!(ring.last_lines(10), vec!["a".to_owned(), "b".to_owned()]);
}
