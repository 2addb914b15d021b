//! Snapshot store tests: atomic multi-field reads under a concurrent
//! writer, and feed thread lifecycle.

use bolus_core::SnapshotStore;
use bolus_traits::{MonotonicClock, PhysiologyQuery, PhysiologySnapshot};
use crossbeam_channel as xch;
use std::thread;

/// Snapshots published with correlated fields; a torn read would break the
/// correlation.
fn correlated(k: f64) -> PhysiologySnapshot {
    PhysiologySnapshot {
        bolus_iob: k,
        basal_iob: 2.0 * k,
        cob: 3.0 * k,
    }
}

#[test]
fn readers_never_observe_a_torn_snapshot() {
    let store = SnapshotStore::new(correlated(0.0));
    let writer_store = store.clone();

    let writer = thread::spawn(move || {
        for i in 1..=2_000u32 {
            writer_store.publish(u64::from(i), correlated(f64::from(i)));
        }
    });

    let mut readers = Vec::new();
    for _ in 0..4 {
        let reader_store = store.clone();
        readers.push(thread::spawn(move || {
            for _ in 0..2_000 {
                let snap = reader_store.snapshot(0).unwrap();
                assert_eq!(snap.basal_iob, 2.0 * snap.bolus_iob, "torn read: {snap:?}");
                assert_eq!(snap.cob, 3.0 * snap.bolus_iob, "torn read: {snap:?}");
            }
        }));
    }

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}

#[test]
fn feed_drains_the_channel_before_disconnect_exit() {
    // Repeated because the old-snapshot outcome was a race: a single run
    // can get lucky even when queued updates are being discarded.
    for round in 0..200 {
        let store = SnapshotStore::new(PhysiologySnapshot::default());
        let (tx, rx) = xch::bounded(16);

        let feed = store.spawn_feed(rx, MonotonicClock::new());
        for i in 1..=10u32 {
            tx.send(correlated(f64::from(i))).unwrap();
        }
        drop(tx);
        // Dropping the handle joins the thread, which drains queued updates
        // before it exits.
        drop(feed);

        let snap = store.snapshot(0).unwrap();
        assert_eq!(snap, correlated(10.0), "stale snapshot on round {round}");
    }
}

#[test]
fn feed_shuts_down_while_producer_is_still_alive() {
    let store = SnapshotStore::new(PhysiologySnapshot::default());
    let (tx, rx) = xch::bounded::<PhysiologySnapshot>(1);

    let feed = store.spawn_feed(rx, MonotonicClock::new());
    drop(feed); // must join promptly via the shutdown flag, not block on recv
    drop(tx);
}

#[test]
fn publish_updates_the_stamp() {
    let store = SnapshotStore::new(PhysiologySnapshot::default());
    assert_eq!(store.as_of_ms(), 0);
    store.publish(42, correlated(1.0));
    assert_eq!(store.as_of_ms(), 42);
}
