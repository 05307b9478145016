//! Fixed-workload throughput driver.
//!
//! Spawns producer and consumer threads against one ring, moves a fixed
//! number of items through it, then shuts the workers down the way an
//! orchestrator is expected to: request shutdown, `wake_all` once, join.
//!
//! Producers draw globally unique tickets `0..items` from a shared counter,
//! so the sum of everything consumed is known in advance and
//! [`Report::checksum`] doubles as a conservation check.
//!
//! # Example
//!
//! ```
//! use nexus_ring::harness::{self, Report, Workload};
//! use nexus_ring::{RingConfig, RingKind};
//!
//! let ring = RingConfig::new(RingKind::LockFree, 64).build::<u64>().unwrap();
//! let report = harness::run(&ring, &Workload::new(2, 2, 10_000));
//!
//! assert_eq!(report.consumed, 10_000);
//! assert_eq!(report.checksum, Report::expected_checksum(10_000));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::shutdown::Shutdown;
use crate::trace::{debug, info};
use crate::{CallerId, RingBuffer};

const POLL: Duration = Duration::from_micros(100);

/// Shape of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    /// Producer threads.
    pub producers: u32,
    /// Consumer threads.
    pub consumers: u32,
    /// Total items moved through the ring.
    pub items: u64,
}

impl Workload {
    /// Creates a workload.
    #[must_use]
    pub const fn new(producers: u32, consumers: u32, items: u64) -> Self {
        Self {
            producers,
            consumers,
            items,
        }
    }

    const fn is_empty(&self) -> bool {
        self.producers == 0 || self.consumers == 0 || self.items == 0
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Report {
    /// Items successfully produced.
    pub produced: u64,
    /// Items successfully consumed.
    pub consumed: u64,
    /// Wrapping sum of every consumed value.
    pub checksum: u64,
    /// Wall time from spawning the first worker to joining the last.
    pub elapsed: Duration,
}

impl Report {
    /// Items consumed per second.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.consumed as f64 / secs
        }
    }

    /// The checksum of a lossless run of `items` items: `0 + 1 + ... +
    /// (items - 1)`, wrapping.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn expected_checksum(items: u64) -> u64 {
        if items == 0 {
            return 0;
        }
        let n = items as u128;
        (n * (n - 1) / 2) as u64
    }
}

/// Moves `workload.items` items through `ring` and reports how long it took.
///
/// Returns an empty report without spawning anything if the workload has
/// no producers, no consumers or no items.
#[cfg_attr(not(feature = "tracing"), allow(unused_variables, unused_assignments))]
pub fn run<R: RingBuffer<u64> + ?Sized>(ring: &R, workload: &Workload) -> Report {
    if workload.is_empty() {
        return Report::default();
    }

    let items = workload.items;
    let shutdown = Shutdown::new();
    let tickets = AtomicU64::new(0);
    let produced = AtomicU64::new(0);
    let consumed = AtomicU64::new(0);
    let checksum = AtomicU64::new(0);

    info!(
        producers = workload.producers,
        consumers = workload.consumers,
        items,
        capacity = ring.capacity(),
        "run started"
    );

    let start = Instant::now();

    thread::scope(|s| {
        let shutdown = &shutdown;
        let tickets = &tickets;
        let produced = &produced;
        let consumed = &consumed;
        let checksum = &checksum;

        for id in 0..workload.producers {
            s.spawn(move || {
                let caller = CallerId(id);
                let mut count = 0;

                'tickets: loop {
                    let ticket = tickets.fetch_add(1, Ordering::Relaxed);
                    if ticket >= items {
                        break;
                    }
                    while !ring.produce(ticket, caller, shutdown) {
                        if shutdown.is_requested() {
                            break 'tickets;
                        }
                        thread::yield_now();
                    }
                    count += 1;
                }

                produced.fetch_add(count, Ordering::Relaxed);
                debug!(%caller, count, "producer finished");
            });
        }

        for id in 0..workload.consumers {
            s.spawn(move || {
                let caller = CallerId(id);
                let mut count = 0u64;
                let mut sum = 0u64;

                while consumed.load(Ordering::Acquire) < items && !shutdown.is_requested() {
                    match ring.consume(caller, shutdown) {
                        Some(value) => {
                            sum = sum.wrapping_add(value);
                            count += 1;
                            consumed.fetch_add(1, Ordering::Release);
                        }
                        None => thread::yield_now(),
                    }
                }

                checksum.fetch_add(sum, Ordering::Relaxed);
                debug!(%caller, count, "consumer finished");
            });
        }

        while consumed.load(Ordering::Acquire) < items {
            thread::sleep(POLL);
        }

        shutdown.request();
        ring.wake_all();
    });

    let report = Report {
        produced: produced.into_inner(),
        consumed: consumed.into_inner(),
        checksum: checksum.into_inner(),
        elapsed: start.elapsed(),
    };

    info!(
        elapsed = ?report.elapsed,
        throughput = report.throughput(),
        "run finished"
    );

    report
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::{RingConfig, RingKind};

    #[test]
    fn expected_checksum_values() {
        assert_eq!(Report::expected_checksum(0), 0);
        assert_eq!(Report::expected_checksum(1), 0);
        assert_eq!(Report::expected_checksum(4), 6);
        assert_eq!(Report::expected_checksum(4000), 7_998_000);
    }

    #[test]
    fn empty_workload() {
        let ring = RingConfig::new(RingKind::LockFree, 4).build::<u64>().unwrap();

        assert_eq!(run(&ring, &Workload::new(0, 1, 10)), Report::default());
        assert_eq!(run(&ring, &Workload::new(1, 0, 10)), Report::default());
        assert_eq!(run(&ring, &Workload::new(1, 1, 0)), Report::default());
    }

    #[test]
    fn every_kind_conserves_items() {
        for kind in RingKind::ALL {
            let ring = RingConfig::new(kind, 16)
                .with_wait(Duration::from_millis(10))
                .build::<u64>()
                .unwrap();

            let report = run(&ring, &Workload::new(4, 3, 4000));

            assert_eq!(report.produced, 4000, "{kind}");
            assert_eq!(report.consumed, 4000, "{kind}");
            assert_eq!(report.checksum, Report::expected_checksum(4000), "{kind}");
            assert_eq!(ring.count(), 0, "{kind}");
            assert!(report.throughput() > 0.0);
        }
    }

    #[test]
    fn single_cell_ring() {
        let ring = RingConfig::new(RingKind::Blocking, 1)
            .with_wait(Duration::from_millis(5))
            .build::<u64>()
            .unwrap();

        let report = run(&ring, &Workload::new(3, 3, 500));

        assert_eq!(report.consumed, 500);
        assert_eq!(report.checksum, Report::expected_checksum(500));
    }

    #[test]
    fn throughput_of_zero_elapsed() {
        let report = Report {
            consumed: 10,
            ..Report::default()
        };
        assert!(report.throughput().abs() < f64::EPSILON);
    }
}
