//! Concurrent insert/snapshot behaviour of the rolling buffer.

use reqtrail_core::entry::LogEntry;
use reqtrail_store::EntryStore;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

fn entry(id: u64) -> LogEntry {
    LogEntry::new(id, "POST", "http://localhost/orders")
}

#[test]
fn concurrent_inserts_never_exceed_capacity() {
    let store = Arc::new(EntryStore::new(100));
    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..1_000u64 {
                    store.insert(entry(t * 1_000 + i));
                    assert!(store.len() <= 100);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let snap = store.snapshot(None);
    assert_eq!(snap.len(), 100);
    let unique: HashSet<u64> = snap.iter().map(|e| e.id).collect();
    assert_eq!(unique.len(), 100);
}

#[test]
fn each_thread_keeps_its_own_insertion_order() {
    let store = Arc::new(EntryStore::new(10_000));
    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..500u64 {
                    store.insert(entry(t * 1_000_000 + i));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let snap = store.snapshot(None);
    assert_eq!(snap.len(), 2_000);
    for t in 0..4u64 {
        let mine: Vec<u64> = snap
            .iter()
            .map(|e| e.id)
            .filter(|id| id / 1_000_000 == t)
            .collect();
        assert!(mine.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn readers_run_alongside_writers() {
    let store = Arc::new(EntryStore::new(50));
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let store = Arc::clone(&store);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut reads = 0usize;
            loop {
                let snap = store.snapshot(Some(20));
                assert!(snap.len() <= 20);
                reads += 1;
                if done.load(Ordering::Acquire) {
                    break reads;
                }
            }
        })
    };

    for id in 0..5_000u64 {
        store.insert(entry(id));
    }
    done.store(true, Ordering::Release);

    assert!(reader.join().unwrap() > 0);
    let last: Vec<u64> = store.snapshot(None).iter().map(|e| e.id).collect();
    assert_eq!(last, (4_950..5_000).collect::<Vec<_>>());
}
