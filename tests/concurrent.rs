//! Multi-thread producer / single-reader scenario.
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use shm_pagelog::{Page, PageOptions, PopOutcome, PushOutcome};
use tempfile::NamedTempFile;

#[test]
fn concurrent_writers_single_reader_sees_every_message_once() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 200;

    let file = NamedTempFile::new().unwrap();
    let page = Arc::new(
        Page::open(
            file.path(),
            PageOptions {
                arena_size: 4 * 1024 * 1024,
            },
        )
        .unwrap(),
    );

    let mut expected: HashMap<String, usize> = HashMap::new();
    let mut handles = Vec::new();

    for writer in 0..WRITERS {
        for i in 0..PER_WRITER {
            let msg = format!("writer-{writer}-msg-{i}");
            *expected.entry(msg).or_insert(0) += 1;
        }
    }

    for writer in 0..WRITERS {
        let page = Arc::clone(&page);
        handles.push(thread::spawn(move || {
            for i in 0..PER_WRITER {
                let msg = format!("writer-{writer}-msg-{i}");
                loop {
                    match page.push(msg.as_bytes()).expect("payload never contains 0xFF") {
                        PushOutcome::Written(_) => break,
                        PushOutcome::Full => panic!("arena sized generously enough not to fill"),
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut cursor = 0u64;

    loop {
        match page.pop(cursor) {
            PopOutcome::Success { data, advance } => {
                let msg = String::from_utf8(data.to_vec()).unwrap();
                *seen.entry(msg).or_insert(0) += 1;
                cursor += advance;
            }
            PopOutcome::Empty | PopOutcome::Finished => break,
            PopOutcome::Error(err) => panic!("malformed frame: {err}"),
        }
    }

    assert_eq!(seen, expected);
}
