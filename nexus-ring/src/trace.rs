//! Logging for ring construction, shutdown and rejected operations.
//!
//! Enable with `--features tracing`. Every macro is a no-op when the
//! feature is disabled, so `produce`/`consume` pay nothing for it.

/// Installs a `tracing` subscriber writing to stderr.
///
/// The filter is taken from `RUST_LOG`, defaulting to `nexus_ring=debug`.
/// Safe to call more than once; later calls are ignored. Does nothing if
/// the `tracing` feature is not enabled.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nexus_ring=debug"));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}

/// Installs a `tracing` subscriber writing to stderr.
///
/// Does nothing: the `tracing` feature is not enabled.
#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, info, trace};

#[cfg(not(feature = "tracing"))]
macro_rules! trace_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
macro_rules! info_noop {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use debug_noop as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use info_noop as info;
#[cfg(not(feature = "tracing"))]
pub(crate) use trace_noop as trace;

#[cfg(all(test, feature = "tracing", not(loom)))]
mod tests {
    use std::time::Duration;

    use super::init_tracing;
    use crate::harness::{self, Report, Workload};
    use crate::{CallerId, RingConfig, RingKind, Shutdown};

    #[test]
    fn every_kind_logs_through_subscriber() {
        init_tracing();
        init_tracing();

        for kind in RingKind::ALL {
            let ring = RingConfig::new(kind, 1)
                .with_wait(Duration::from_millis(1))
                .build::<u64>()
                .unwrap();
            let shutdown = Shutdown::new();

            assert!(ring.produce(1, CallerId(0), &shutdown), "{kind}");
            assert!(!ring.produce(2, CallerId(0), &shutdown), "{kind}");
            assert_eq!(ring.consume(CallerId(1), &shutdown), Some(1), "{kind}");
            assert_eq!(ring.consume(CallerId(1), &shutdown), None, "{kind}");

            shutdown.request();
            ring.wake_all();
            assert!(!ring.produce(3, CallerId(0), &shutdown), "{kind}");
            assert_eq!(ring.consume(CallerId(1), &shutdown), None, "{kind}");

            let report = harness::run(&ring, &Workload::new(2, 2, 200));
            assert_eq!(report.checksum, Report::expected_checksum(200), "{kind}");
        }
    }
}
