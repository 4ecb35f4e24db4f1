//! # Pool Reporting
//!
//! The pool core never logs. Whoever owns a pool can attach a
//! [`PoolReporter`], which polls [`ObjectPool::statistics`] on a background
//! thread and turns the snapshots into `tracing` events:
//!
//! ```text
//!   ObjectPool ◀── statistics() ── [reporter thread] ──▶ tracing
//!                                    wakes every interval,
//!                                    or at once on stop()
//! ```
//!
//! The free functions [`log_exhausted`] and [`log_release_failure`] cover the
//! per-call diagnostics a caller may want when an operation comes back empty.
//! [`allocate_or_log`] and [`release_or_log`] wrap the two pool calls that
//! most often need them.

use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

// The stop signal is outside the loom models, so not taken from `crate::sync`.
use parking_lot::{Condvar, Mutex};

use crate::config::PoolConfig;
use crate::entity::{EntityId, Poolable};
use crate::error::{PoolError, PoolResult};
use crate::handle::EntityHandle;
use crate::pool::{ObjectPool, ReleaseOutcome};
use crate::stats::PoolStats;

type Sampler = Arc<dyn Fn() -> PoolStats + Send + Sync>;

/// Logs a failed allocate.
pub fn log_exhausted(pool: &str, capacity: usize) {
    tracing::warn!(pool, capacity, "allocation failed: pool exhausted");
}

/// Logs a release, add-reference or force-release that found nothing to act on.
pub fn log_release_failure(pool: &str, id: EntityId) {
    tracing::warn!(pool, entity = id.get(), "entity is not in use");
}

/// Allocates from `pool`, logging under `name` when it is exhausted.
pub fn allocate_or_log<T: Poolable>(
    name: &str,
    pool: &ObjectPool<T>,
) -> Option<EntityHandle<T>> {
    match pool.allocate() {
        Ok(handle) => Some(handle),
        Err(PoolError::Exhausted { capacity }) => {
            log_exhausted(name, capacity);
            None
        }
        Err(err) => {
            tracing::warn!(pool = name, error = %err, "allocation failed");
            None
        }
    }
}

/// Releases one reference, logging under `name` when the entity was not in
/// use. Returns true only when the entity went back to the free list.
pub fn release_or_log<T: Poolable>(
    name: &str,
    pool: &ObjectPool<T>,
    handle: &EntityHandle<T>,
) -> bool {
    match pool.try_release(handle) {
        Ok(ReleaseOutcome::Returned) => true,
        Ok(ReleaseOutcome::StillShared { .. }) => false,
        Err(_) => {
            log_release_failure(name, handle.id());
            false
        }
    }
}

/// Emits one snapshot at debug level.
fn log_snapshot(pool: &str, stats: &PoolStats) {
    tracing::debug!(
        pool,
        created = stats.created,
        allocated = stats.allocated,
        released = stats.released,
        in_use = stats.in_use,
        free = stats.free,
        peak_in_use = stats.peak_in_use,
        capacity = stats.capacity,
        reuse_rate = stats.reuse_rate,
        "pool statistics"
    );
}

/// Edge-triggered high-water detector.
///
/// Fires once when utilization reaches the ratio, then stays quiet until it
/// falls back below.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HighWaterMark {
    ratio: f64,
    above: bool,
}

impl HighWaterMark {
    /// Creates a detector for the given utilization ratio.
    #[must_use]
    pub const fn new(ratio: f64) -> Self {
        Self {
            ratio,
            above: false,
        }
    }

    /// Feeds one snapshot. Returns true when this snapshot crossed the mark.
    pub fn observe(&mut self, stats: &PoolStats) -> bool {
        let above = stats.capacity > 0 && stats.utilization() >= self.ratio;
        let crossed = above && !self.above;
        self.above = above;
        crossed
    }

    /// Returns true while utilization is at or above the mark.
    #[inline]
    #[must_use]
    pub const fn is_above(&self) -> bool {
        self.above
    }
}

/// Stop flag shared with the reporter thread.
struct Shutdown {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl Shutdown {
    fn new() -> Self {
        Self {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    fn signal(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Sleeps up to `timeout`. Returns true once stop was requested.
    fn wait(&self, timeout: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            self.wake.wait_for(&mut stopped, timeout);
        }
        *stopped
    }
}

/// Background thread that logs pool statistics at a fixed interval.
///
/// Stopped and joined on [`stop`](Self::stop) or drop; the final snapshot is
/// logged at info level.
pub struct PoolReporter {
    name: Arc<str>,
    sampler: Sampler,
    shutdown: Arc<Shutdown>,
    worker: Option<JoinHandle<()>>,
}

impl PoolReporter {
    /// Starts reporting on `pool`.
    ///
    /// # Arguments
    ///
    /// * `name` - Label attached to every event
    /// * `pool` - The pool to sample
    /// * `interval` - Time between snapshots
    /// * `high_water_ratio` - Utilization that triggers a warning
    ///
    /// # Errors
    ///
    /// [`PoolError::InvalidConfig`] for a zero interval, [`PoolError::Io`]
    /// if the thread cannot be spawned.
    pub fn spawn<T: Poolable>(
        name: &str,
        pool: Arc<ObjectPool<T>>,
        interval: Duration,
        high_water_ratio: f64,
    ) -> PoolResult<Self> {
        if interval.is_zero() {
            return Err(PoolError::InvalidConfig(
                "report interval must be greater than zero".to_string(),
            ));
        }

        let name: Arc<str> = Arc::from(name);
        let sampler: Sampler = Arc::new(move || pool.statistics());
        let shutdown = Arc::new(Shutdown::new());

        let worker_name = Arc::clone(&name);
        let worker_sampler = Arc::clone(&sampler);
        let worker_shutdown = Arc::clone(&shutdown);
        let worker = thread::Builder::new()
            .name(format!("reclaim-report-{name}"))
            .spawn(move || {
                Self::report_loop(
                    &worker_name,
                    &*worker_sampler,
                    &worker_shutdown,
                    interval,
                    HighWaterMark::new(high_water_ratio),
                );
            })
            .map_err(|e| PoolError::Io(format!("failed to spawn reporter: {e}")))?;

        Ok(Self {
            name,
            sampler,
            shutdown,
            worker: Some(worker),
        })
    }

    /// Starts reporting with the interval and ratio from `config`.
    ///
    /// # Errors
    ///
    /// As [`spawn`](Self::spawn), plus config validation failures.
    pub fn from_config<T: Poolable>(
        name: &str,
        pool: Arc<ObjectPool<T>>,
        config: &PoolConfig,
    ) -> PoolResult<Self> {
        config.validate()?;
        Self::spawn(
            name,
            pool,
            Duration::from_millis(config.report_interval_ms),
            config.high_water_ratio,
        )
    }

    /// Reporter thread main loop.
    fn report_loop(
        name: &str,
        sample: &(dyn Fn() -> PoolStats + Send + Sync),
        shutdown: &Shutdown,
        interval: Duration,
        mut high_water: HighWaterMark,
    ) {
        tracing::debug!(pool = name, "reporter started");

        while !shutdown.wait(interval) {
            let stats = sample();
            log_snapshot(name, &stats);
            if high_water.observe(&stats) {
                tracing::warn!(
                    pool = name,
                    in_use = stats.in_use,
                    capacity = stats.capacity,
                    utilization = stats.utilization(),
                    "pool usage reached high-water mark"
                );
            }
        }

        let stats = sample();
        tracing::info!(
            pool = name,
            created = stats.created,
            allocated = stats.allocated,
            released = stats.released,
            peak_in_use = stats.peak_in_use,
            reuse_rate = stats.reuse_rate,
            "reporter stopped"
        );
    }

    /// Logs a snapshot right away and returns it.
    pub fn report_now(&self) -> PoolStats {
        let stats = (self.sampler)();
        log_snapshot(&self.name, &stats);
        stats
    }

    /// Returns the label used in events.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true while the thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Stops the thread and waits for it.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        self.shutdown.signal();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!(pool = &*self.name, "reporter thread panicked");
            }
        }
    }
}

impl Drop for PoolReporter {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}

impl fmt::Debug for PoolReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolReporter")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::entity::BufferEntity;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Collects the fields of every warning, one line per event.
    #[derive(Clone, Default)]
    struct Warnings(Arc<Mutex<Vec<String>>>);

    #[derive(Default)]
    struct FieldText(String);

    impl Visit for FieldText {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.push_str(&format!("{}={:?} ", field.name(), value));
        }
    }

    impl<S: Subscriber> Layer<S> for Warnings {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                let mut text = FieldText::default();
                event.record(&mut text);
                self.0.lock().push(text.0);
            }
        }
    }

    fn capture_warnings(f: impl FnOnce()) -> Vec<String> {
        let warnings = Warnings::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        tracing::subscriber::with_default(subscriber, f);
        let lines = warnings.0.lock().clone();
        lines
    }

    fn stats(in_use: usize, capacity: usize) -> PoolStats {
        PoolStats {
            in_use,
            capacity,
            ..PoolStats::default()
        }
    }

    #[test]
    fn test_high_water_fires_once_per_crossing() {
        let mut mark = HighWaterMark::new(0.75);

        assert!(!mark.observe(&stats(2, 4)));
        assert!(mark.observe(&stats(3, 4)));
        assert!(mark.is_above());
        assert!(!mark.observe(&stats(4, 4)));
        assert!(!mark.observe(&stats(1, 4)));
        assert!(!mark.is_above());
        assert!(mark.observe(&stats(3, 4)));
    }

    #[test]
    fn test_high_water_ignores_zero_capacity() {
        let mut mark = HighWaterMark::new(0.5);
        assert!(!mark.observe(&stats(0, 0)));
    }

    #[test]
    fn test_reporter_lifecycle() {
        let pool = Arc::new(ObjectPool::<BufferEntity>::new(2));
        let reporter =
            PoolReporter::spawn("test", Arc::clone(&pool), Duration::from_millis(5), 0.5)
                .unwrap();
        assert_eq!(reporter.name(), "test");

        let handle = pool.allocate().unwrap();
        let snapshot = reporter.report_now();
        assert_eq!(snapshot.in_use, 1);
        assert_eq!(snapshot.allocated, 1);

        thread::sleep(Duration::from_millis(20));
        assert!(reporter.is_running());

        reporter.stop();
        assert!(pool.release(&handle));
    }

    #[test]
    fn test_reporter_rejects_zero_interval() {
        let pool = Arc::new(ObjectPool::<BufferEntity>::new(1));
        let err = PoolReporter::spawn("test", pool, Duration::ZERO, 0.5).unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfig(_)));
    }

    #[test]
    fn test_reporter_from_config_drop_joins() {
        let pool = Arc::new(ObjectPool::<BufferEntity>::new(1));
        let config = PoolConfig {
            capacity: 1,
            report_interval_ms: 1,
            ..PoolConfig::default()
        };
        let reporter = PoolReporter::from_config("cfg", Arc::clone(&pool), &config).unwrap();
        drop(reporter);

        // The sampler's clone of the pool went away with the thread.
        assert_eq!(Arc::strong_count(&pool), 1);
    }

    #[test]
    fn test_log_helpers_emit_warnings() {
        let lines = capture_warnings(|| {
            log_exhausted("cache", 4);
            log_release_failure("cache", EntityId::new(7));
        });

        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("message=allocation failed: pool exhausted"));
        assert!(lines[0].contains("pool=\"cache\""));
        assert!(lines[0].contains("capacity=4"));
        assert!(lines[1].contains("message=entity is not in use"));
        assert!(lines[1].contains("entity=7"));
    }

    #[test]
    fn test_allocate_or_log_warns_only_when_exhausted() {
        let pool = ObjectPool::<BufferEntity>::new(1);
        let mut first = None;
        let mut second = None;
        let lines = capture_warnings(|| {
            first = allocate_or_log("frames", &pool);
            second = allocate_or_log("frames", &pool);
        });

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("capacity=1"));
        assert!(lines[0].contains("pool=\"frames\""));
    }

    #[test]
    fn test_release_or_log_warns_on_stale_release() {
        let pool = ObjectPool::<BufferEntity>::new(1);
        let handle = pool.allocate().unwrap();
        assert!(pool.add_reference(&handle));

        let mut outcomes = Vec::new();
        let lines = capture_warnings(|| {
            outcomes.push(release_or_log("frames", &pool, &handle));
            outcomes.push(release_or_log("frames", &pool, &handle));
            outcomes.push(release_or_log("frames", &pool, &handle));
        });

        assert_eq!(outcomes, vec![false, true, false]);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(&format!("entity={}", handle.id().get())));
        pool.check_invariants().unwrap();
    }
}
