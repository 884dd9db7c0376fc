use std::{
    cell::RefCell,
    fmt,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::{Result, Watcher, WatcherRegistry};

/// One poll measurement: what the loop asked for versus what it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSample {
    /// Timeout passed to the poll, `None` if it could block indefinitely.
    pub expected: Option<Duration>,
    /// Time between the prepare and check timestamps of the iteration.
    pub actual: Duration,
}

impl PollSample {
    /// How much longer than requested the poll blocked, if it did.
    pub fn overshoot(&self) -> Option<Duration> {
        let expected = self.expected?;
        self.actual
            .checked_sub(expected)
            .filter(|over| !over.is_zero())
    }
}

/// Watcher pair measuring actual poll duration against the requested timeout.
///
/// The prepare watcher stores the iteration's timestamp and timeout; the check
/// watcher turns them into a [`PollSample`]. Clone the timer to keep a query
/// handle after attaching it.
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use evwatch::{LoopHooks, WatcherRegistry, watchers::PollTimer};
///
/// let mut registry = WatcherRegistry::default();
/// let timer = PollTimer::new();
/// timer.attach(&mut registry)?;
///
/// let start = Instant::now();
/// registry.run_prepare_phase(start, Some(Duration::from_millis(10)));
/// registry.run_check_phase(start + Duration::from_millis(12));
///
/// let sample = timer.last().unwrap();
/// assert_eq!(sample.actual, Duration::from_millis(12));
/// assert_eq!(sample.overshoot(), Some(Duration::from_millis(2)));
/// # Ok::<(), evwatch::Error>(())
/// ```
#[derive(Clone, Default)]
pub struct PollTimer {
    inner: Rc<RefCell<PollTimerInner>>,
}

#[derive(Default)]
struct PollTimerInner {
    pending: Option<(Instant, Option<Duration>)>,
    last: Option<PollSample>,
    samples: usize,
    overshoots: usize,
    total_blocked: Duration,
    tolerance: Duration,
}

impl PollTimer {
    /// Create a timer with no tolerance for overshoot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore overshoots up to `tolerance` when counting them.
    pub fn with_tolerance(self, tolerance: Duration) -> Self {
        self.inner.borrow_mut().tolerance = tolerance;
        self
    }

    /// Register the timer's watchers and return `[prepare, check]` handles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TornDown`](crate::Error::TornDown) if the registry has
    /// been torn down.
    pub fn attach(&self, registry: &mut WatcherRegistry) -> Result<[Watcher; 2]> {
        let inner = self.inner.clone();
        let prepare = registry.add_prepare(move |_, ctx| {
            inner.borrow_mut().pending = Some((ctx.now(), ctx.timeout()));
        })?;

        let inner = self.inner.clone();
        let check = registry.add_check(move |_, ctx| {
            inner.borrow_mut().record(ctx.now());
        })?;

        Ok([prepare, check])
    }

    /// The most recent sample.
    pub fn last(&self) -> Option<PollSample> {
        self.inner.borrow().last
    }

    /// Number of completed prepare/check measurements.
    pub fn samples(&self) -> usize {
        self.inner.borrow().samples
    }

    /// Number of samples that blocked longer than requested (beyond tolerance).
    pub fn overshoots(&self) -> usize {
        self.inner.borrow().overshoots
    }

    /// Total time spent blocked across all samples.
    pub fn total_blocked(&self) -> Duration {
        self.inner.borrow().total_blocked
    }

    /// Forget all samples. The tolerance is kept.
    pub fn reset(&self) {
        let mut inner = self.inner.borrow_mut();
        let tolerance = inner.tolerance;
        *inner = PollTimerInner {
            tolerance,
            ..PollTimerInner::default()
        };
    }
}

impl PollTimerInner {
    fn record(&mut self, now: Instant) {
        // Check watcher added mid-iteration: no prepare sample to compare with.
        let Some((started, expected)) = self.pending.take() else {
            return;
        };
        let sample = PollSample {
            expected,
            actual: now.saturating_duration_since(started),
        };
        if sample.overshoot().is_some_and(|over| over > self.tolerance) {
            self.overshoots += 1;
            tracing::debug!(
                expected = ?sample.expected,
                actual = ?sample.actual,
                "poll overshot its timeout"
            );
        }
        self.samples += 1;
        self.total_blocked += sample.actual;
        self.last = Some(sample);
    }
}

impl fmt::Debug for PollTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("PollTimer")
            .field("samples", &inner.samples)
            .field("overshoots", &inner.overshoots)
            .field("total_blocked", &inner.total_blocked)
            .field("last", &inner.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoopHooks;

    fn iterate(
        registry: &mut WatcherRegistry,
        at: Instant,
        timeout: Option<Duration>,
        blocked: Duration,
    ) {
        registry.run_prepare_phase(at, timeout);
        registry.run_check_phase(at + blocked);
    }

    #[test]
    fn test_measures_blocked_time() {
        let mut registry = WatcherRegistry::default();
        let timer = PollTimer::new();
        timer.attach(&mut registry).unwrap();

        let start = Instant::now();
        let second = start + Duration::from_secs(1);
        iterate(&mut registry, start, Some(Duration::from_secs(1)), Duration::from_millis(400));
        iterate(&mut registry, second, None, Duration::from_secs(3));

        assert_eq!(timer.samples(), 2);
        assert_eq!(timer.overshoots(), 0);
        assert_eq!(timer.total_blocked(), Duration::from_millis(3400));
        assert_eq!(
            timer.last(),
            Some(PollSample {
                expected: None,
                actual: Duration::from_secs(3),
            })
        );
    }

    #[test]
    fn test_counts_overshoots_beyond_tolerance() {
        let mut registry = WatcherRegistry::default();
        let timer = PollTimer::new().with_tolerance(Duration::from_millis(5));
        timer.attach(&mut registry).unwrap();

        let start = Instant::now();
        let timeout = Some(Duration::from_millis(100));
        iterate(&mut registry, start, timeout, Duration::from_millis(103));
        iterate(&mut registry, start, timeout, Duration::from_millis(120));

        assert_eq!(timer.samples(), 2);
        assert_eq!(timer.overshoots(), 1);
        assert_eq!(
            timer.last().and_then(|s| s.overshoot()),
            Some(Duration::from_millis(20))
        );
    }

    #[test]
    fn test_check_without_prepare_is_ignored() {
        let mut registry = WatcherRegistry::default();
        let timer = PollTimer::new();
        timer.attach(&mut registry).unwrap();

        registry.run_check_phase(Instant::now());
        assert_eq!(timer.samples(), 0);
        assert!(timer.last().is_none());
    }

    #[test]
    fn test_reset_keeps_tolerance() {
        let mut registry = WatcherRegistry::default();
        let timer = PollTimer::new().with_tolerance(Duration::from_millis(50));
        timer.attach(&mut registry).unwrap();

        let start = Instant::now();
        iterate(&mut registry, start, Some(Duration::ZERO), Duration::from_millis(10));
        timer.reset();
        assert_eq!(timer.samples(), 0);

        iterate(&mut registry, start, Some(Duration::ZERO), Duration::from_millis(10));
        assert_eq!(timer.overshoots(), 0);
        assert_eq!(timer.samples(), 1);
    }

    #[test]
    fn test_released_timer_stops_sampling() {
        let mut registry = WatcherRegistry::default();
        let timer = PollTimer::new();
        let [prepare, check] = timer.attach(&mut registry).unwrap();
        registry.release(prepare).unwrap();
        registry.release(check).unwrap();

        iterate(&mut registry, Instant::now(), None, Duration::from_millis(1));
        assert_eq!(timer.samples(), 0);
    }

    #[test]
    fn test_attach_after_teardown_fails() {
        let mut registry = WatcherRegistry::default();
        registry.teardown();
        assert_eq!(PollTimer::new().attach(&mut registry), Err(crate::Error::TornDown));
        assert!(registry.is_empty());
    }
}
