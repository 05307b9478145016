//! Behaviour every strategy must share, exercised through `dyn RingBuffer`.

#![cfg(not(loom))]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use nexus_ring::{CallerId, RingBuffer, RingConfig, RingKind, Shutdown};

const WAIT: Duration = Duration::from_millis(10);

fn build(kind: RingKind, capacity: usize) -> Arc<dyn RingBuffer<u64>> {
    Arc::from(
        RingConfig::new(kind, capacity)
            .with_wait(WAIT)
            .build::<u64>()
            .unwrap(),
    )
}

#[test]
fn round_trip_capacity_two() {
    for kind in RingKind::ALL {
        let ring = build(kind, 2);
        let shutdown = Shutdown::new();

        assert!(ring.produce(1, CallerId(0), &shutdown), "{kind}");
        assert!(ring.produce(2, CallerId(0), &shutdown), "{kind}");
        assert_eq!(ring.count(), 2, "{kind}");

        assert!(!ring.produce(3, CallerId(0), &shutdown), "{kind}");

        assert_eq!(ring.consume(CallerId(1), &shutdown), Some(1), "{kind}");
        assert_eq!(ring.consume(CallerId(1), &shutdown), Some(2), "{kind}");
        assert_eq!(ring.count(), 0, "{kind}");
    }
}

#[test]
fn fresh_ring_consume_is_empty() {
    for kind in RingKind::ALL {
        let ring = build(kind, 8);
        let shutdown = Shutdown::new();

        assert_eq!(ring.consume(CallerId(0), &shutdown), None, "{kind}");
        assert_eq!(ring.count(), 0, "{kind}");
    }
}

#[test]
fn spsc_fifo_for_various_lengths() {
    for kind in RingKind::ALL {
        for n in [0u64, 1, 7, 64, 5_000] {
            let ring = build(kind, 7);
            let shutdown = Arc::new(Shutdown::new());

            let producer = {
                let ring = Arc::clone(&ring);
                let shutdown = Arc::clone(&shutdown);
                thread::spawn(move || {
                    for i in 0..n {
                        // Distinct, non-sequential values
                        let value = i.wrapping_mul(0x9E37_79B9_7F4A_7C15);
                        while !ring.produce(value, CallerId(0), &shutdown) {
                            thread::yield_now();
                        }
                    }
                })
            };

            let mut received = Vec::with_capacity(n as usize);
            while (received.len() as u64) < n {
                if let Some(value) = ring.consume(CallerId(1), &shutdown) {
                    received.push(value);
                }
            }
            producer.join().unwrap();

            let expected: Vec<u64> = (0..n)
                .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15))
                .collect();
            assert_eq!(received, expected, "{kind} n={n}");
        }
    }
}

#[test]
fn four_producers_three_consumers() {
    const PRODUCERS: u64 = 4;
    const PER_PRODUCER: u64 = 1000;
    const TOTAL: u64 = PRODUCERS * PER_PRODUCER;

    for kind in RingKind::ALL {
        let ring = build(kind, 16);
        let shutdown = Arc::new(Shutdown::new());
        let consumed = Arc::new(AtomicUsize::new(0));
        let values = Arc::new(Mutex::new(Vec::new()));

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let ring = Arc::clone(&ring);
                let shutdown = Arc::clone(&shutdown);
                thread::spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let value = p * PER_PRODUCER + i;
                        while !ring.produce(value, CallerId(p as u32), &shutdown) {
                            if shutdown.is_requested() {
                                return;
                            }
                            thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        let consumers: Vec<_> = (0..3u32)
            .map(|c| {
                let ring = Arc::clone(&ring);
                let shutdown = Arc::clone(&shutdown);
                let consumed = Arc::clone(&consumed);
                let values = Arc::clone(&values);
                thread::spawn(move || {
                    let mut local = Vec::new();
                    while !shutdown.is_requested() {
                        if let Some(value) = ring.consume(CallerId(c), &shutdown) {
                            local.push(value);
                            consumed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    values.lock().unwrap().extend(local);
                })
            })
            .collect();

        for h in producers {
            h.join().unwrap();
        }

        // Drain until everything is accounted for, then stop
        let deadline = Instant::now() + Duration::from_secs(30);
        while consumed.load(Ordering::Relaxed) < TOTAL as usize {
            assert!(Instant::now() < deadline, "{kind}: consumers stalled");
            thread::sleep(Duration::from_millis(1));
        }
        shutdown.request();
        ring.wake_all();

        for h in consumers {
            h.join().unwrap();
        }

        let mut all = values.lock().unwrap().clone();
        all.sort_unstable();
        assert_eq!(all.len() as u64, TOTAL, "{kind}");
        assert_eq!(all, (0..TOTAL).collect::<Vec<_>>(), "{kind}");
        assert_eq!(ring.count(), 0, "{kind}");
    }
}

#[test]
fn shutdown_releases_every_caller() {
    for kind in RingKind::ALL {
        // Long wait window: only the shutdown protocol can release callers
        let full: Arc<dyn RingBuffer<u64>> = Arc::from(
            RingConfig::new(kind, 1)
                .with_wait(Duration::from_secs(60))
                .build::<u64>()
                .unwrap(),
        );
        let empty: Arc<dyn RingBuffer<u64>> = Arc::from(
            RingConfig::new(kind, 1)
                .with_wait(Duration::from_secs(60))
                .build::<u64>()
                .unwrap(),
        );
        let shutdown = Arc::new(Shutdown::new());

        assert!(full.produce(0, CallerId(0), &shutdown));

        let mut handles = Vec::new();
        for id in 0..3u32 {
            let full = Arc::clone(&full);
            let empty = Arc::clone(&empty);
            let shutdown = Arc::clone(&shutdown);
            handles.push(thread::spawn(move || {
                // Retry like a worker loop until told to stop
                while !shutdown.is_requested() {
                    full.produce(u64::from(id), CallerId(id), &shutdown);
                    empty.consume(CallerId(id), &shutdown);
                }
            }));
        }

        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        shutdown.request();
        full.wake_all();
        empty.wake_all();

        for h in handles {
            h.join().unwrap();
        }
        assert!(start.elapsed() < Duration::from_secs(10), "{kind}");

        // Nothing moved after the flag was set
        assert_eq!(full.count(), 1, "{kind}");
        assert_eq!(empty.count(), 0, "{kind}");
        assert!(!full.produce(9, CallerId(0), &shutdown), "{kind}");
        assert_eq!(full.consume(CallerId(0), &shutdown), None, "{kind}");
    }
}

#[test]
fn wake_all_many_times_from_many_threads() {
    for kind in RingKind::ALL {
        let ring = build(kind, 4);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    for _ in 0..100 {
                        ring.wake_all();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let shutdown = Shutdown::new();
        assert!(ring.produce(1, CallerId(0), &shutdown), "{kind}");
        assert_eq!(ring.consume(CallerId(0), &shutdown), Some(1), "{kind}");
    }
}

#[test]
fn capacity_is_fixed() {
    for kind in RingKind::ALL {
        let ring = build(kind, 5);
        let shutdown = Shutdown::new();

        for round in 0..3 {
            for i in 0..5 {
                assert!(ring.produce(i, CallerId(0), &shutdown), "{kind}");
            }
            assert_eq!(ring.count(), 5, "{kind} round {round}");
            assert!(!ring.produce(5, CallerId(0), &shutdown), "{kind}");
            assert_eq!(ring.capacity(), 5, "{kind}");

            while ring.consume(CallerId(0), &shutdown).is_some() {}
            assert_eq!(ring.capacity(), 5, "{kind}");
        }
    }
}
