//! Unit tests for the breccia SDK
//!
//! The storage crate covers the buffer contract; the tests here exercise
//! the shared handle under the concurrency the buffer is specified for:
//! parallel producers, an uploader, and a capacity monitor all working
//! against one instance.

use std::collections::HashSet;
use std::thread;

use bytes::Bytes;

use crate::{LogBuffer, MemoryStore};

fn drain(buffer: &LogBuffer<MemoryStore>, max_bytes: u64, into: &mut Vec<String>) {
    while let Some(block) = buffer.take_block(max_bytes).unwrap() {
        for record in block.records() {
            into.push(String::from_utf8(record.payload().to_vec()).unwrap());
        }
        buffer.confirm_block(&block.id()).unwrap();
    }
}

#[test]
fn handle_clones_share_one_instance() {
    let buffer = LogBuffer::in_memory();
    let other = buffer.clone();

    buffer.add_record(Bytes::from("via first handle")).unwrap();
    assert_eq!(other.record_count().unwrap(), 1);

    let block = other.take_block(1024).unwrap().expect("record visible");
    buffer.confirm_block(&block.id()).unwrap();
    assert_eq!(other.volume().unwrap(), 0);
}

#[test]
fn concurrent_producers_lose_and_duplicate_nothing() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 100;

    let buffer = LogBuffer::in_memory();

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let buffer = buffer.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    buffer
                        .add_record(Bytes::from(format!("p{p}-r{i:03}")))
                        .unwrap();
                }
            })
        })
        .collect();

    // Uploader runs alongside the producers, confirming whatever it gets.
    let uploader = {
        let buffer = buffer.clone();
        thread::spawn(move || {
            let mut delivered = Vec::new();
            let mut idle_rounds = 0;
            while idle_rounds < 20 {
                match buffer.take_block(256).unwrap() {
                    Some(block) => {
                        idle_rounds = 0;
                        for record in block.records() {
                            delivered.push(String::from_utf8(record.payload().to_vec()).unwrap());
                        }
                        buffer.confirm_block(&block.id()).unwrap();
                    }
                    None => {
                        idle_rounds += 1;
                        thread::yield_now();
                    }
                }
            }
            delivered
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    let mut delivered = uploader.join().unwrap();

    // Whatever the uploader thread left behind is still in the buffer.
    drain(&buffer, 256, &mut delivered);

    assert_eq!(delivered.len(), PRODUCERS * PER_PRODUCER);
    let unique: HashSet<_> = delivered.iter().collect();
    assert_eq!(unique.len(), delivered.len(), "a record was delivered twice");
    assert_eq!(buffer.volume().unwrap(), 0);
}

#[test]
fn concurrent_formation_never_selects_overlapping_blocks() {
    let buffer = LogBuffer::in_memory();
    for i in 0..200 {
        buffer.add_record(Bytes::from(format!("r{i:04}"))).unwrap();
    }

    let takers: Vec<_> = (0..4)
        .map(|_| {
            let buffer = buffer.clone();
            thread::spawn(move || {
                let mut mine = Vec::new();
                while let Some(block) = buffer.take_block(60).unwrap() {
                    for record in block.records() {
                        mine.push(String::from_utf8(record.payload().to_vec()).unwrap());
                    }
                }
                mine
            })
        })
        .collect();

    let mut all = Vec::new();
    for taker in takers {
        all.extend(taker.join().unwrap());
    }

    assert_eq!(all.len(), 200);
    let unique: HashSet<_> = all.iter().collect();
    assert_eq!(unique.len(), 200, "two blocks share a record");
}

#[test]
fn racing_confirm_and_fail_resolve_to_exactly_one_outcome() {
    for _ in 0..50 {
        let buffer = LogBuffer::in_memory();
        buffer.add_record(Bytes::from("contested")).unwrap();
        let block = buffer.take_block(1024).unwrap().expect("block");
        let id = block.id();

        let confirmer = {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.confirm_block(&id).unwrap())
        };
        let failer = {
            let buffer = buffer.clone();
            thread::spawn(move || buffer.fail_block(&id).unwrap())
        };
        confirmer.join().unwrap();
        failer.join().unwrap();

        let stats = buffer.stats().unwrap();
        assert_eq!(stats.in_flight_blocks, 0);
        assert!(
            // Confirm won: the record is gone.
            (stats.record_count == 0 && stats.volume_bytes == 0)
                // Fail won: the record is pending again.
                || (stats.record_count == 1 && stats.pending_records == 1),
            "partial resolution: {stats:?}"
        );
    }
}

#[test]
fn capacity_monitor_bounds_volume_alongside_producers() {
    const LIMIT: u64 = 500;

    let buffer = LogBuffer::in_memory();

    let producers: Vec<_> = (0..2)
        .map(|p| {
            let buffer = buffer.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    buffer
                        .add_record(Bytes::from(format!("p{p}-{i:05}-padding")))
                        .unwrap();
                }
            })
        })
        .collect();

    let monitor = {
        let buffer = buffer.clone();
        thread::spawn(move || {
            for _ in 0..100 {
                buffer.enforce_max_volume(LIMIT).unwrap();
                thread::yield_now();
            }
        })
    };

    for producer in producers {
        producer.join().unwrap();
    }
    monitor.join().unwrap();

    // Producers may have outrun the monitor's last pass; one more pass
    // under no contention must land at or below the limit.
    buffer.enforce_max_volume(LIMIT).unwrap();
    assert!(buffer.volume().unwrap() <= LIMIT);
}

mod journal_backed {
    use tempfile::TempDir;

    use super::*;
    use crate::BufferConfig;

    #[test]
    fn open_reopen_through_the_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("buffer.journal");

        {
            let buffer = LogBuffer::open(&path).unwrap();
            buffer.add_record(Bytes::from("durable")).unwrap();
        }

        let buffer = LogBuffer::open(&path).unwrap();
        assert_eq!(buffer.record_count().unwrap(), 1);
        let block = buffer.take_block(1024).unwrap().expect("record");
        assert_eq!(block.records()[0].payload().as_ref(), b"durable");
    }

    #[test]
    fn open_with_config_places_and_tunes_the_journal() {
        let dir = TempDir::new().unwrap();
        let mut config = BufferConfig::default();
        config.storage.data_dir = dir.path().join("data");

        let buffer = LogBuffer::open_with_config(&config).unwrap();
        buffer.add_record(Bytes::from("configured")).unwrap();
        assert!(config.journal_path().exists());

        // Oversized records are accepted, warned about, and stay pending.
        let big = vec![0u8; (config.limits.block_size_bytes + 1) as usize];
        buffer.add_record(Bytes::from(big)).unwrap();
        assert_eq!(buffer.record_count().unwrap(), 2);
        let block = buffer
            .take_block(config.limits.block_size_bytes)
            .unwrap()
            .expect("small record fits");
        assert_eq!(block.len(), 1);
        assert_eq!(buffer.stats().unwrap().pending_records, 1);
    }

    #[test]
    fn explicit_compaction_through_the_handle() {
        let dir = TempDir::new().unwrap();
        let buffer = LogBuffer::open(dir.path().join("buffer.journal")).unwrap();

        for _ in 0..4 {
            buffer.add_record(Bytes::from(vec![0u8; 64])).unwrap();
        }
        let block = buffer.take_block(256).unwrap().expect("all records");
        buffer.confirm_block(&block.id()).unwrap();

        let result = buffer.compact().unwrap();
        assert_eq!(result.entries_after, 0);
        assert!(result.bytes_reclaimed > 0);
    }
}
