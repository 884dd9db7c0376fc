use std::time::{Duration, Instant};

use crate::{InvocationContext, Phase, WatcherRegistry};

/// The calls a dispatch loop makes into its watcher registry.
///
/// A loop iteration looks like this:
///
/// ```text
/// compute timeout
/// run_prepare_phase(now, timeout)
/// poll(timeout)
/// run_check_phase(now)
/// dispatch ready events
/// ```
///
/// and [`teardown`](Self::teardown) runs once when the loop itself is freed.
/// Any type that owns a registry can implement this trait by delegation,
/// which is how a loop keeps the rest of its internals to itself.
pub trait LoopHooks {
    /// Invoke prepare watchers just before polling.
    ///
    /// `timeout` is the duration the loop will pass to its poll, `None` when no
    /// timed activity is pending.
    fn run_prepare_phase(&mut self, now: Instant, timeout: Option<Duration>);

    /// Invoke check watchers right after the poll returns.
    fn run_check_phase(&mut self, now: Instant);

    /// Release every watcher still registered. Later releases of their handles
    /// are rejected as misuse.
    fn teardown(&mut self);
}

impl LoopHooks for WatcherRegistry {
    fn run_prepare_phase(&mut self, now: Instant, timeout: Option<Duration>) {
        self.run_phase(Phase::Prepare, &InvocationContext::prepare(now, timeout));
    }

    fn run_check_phase(&mut self, now: Instant) {
        self.run_phase(Phase::Check, &InvocationContext::check(now));
    }

    fn teardown(&mut self) {
        self.shutdown();
    }
}
