use std::time::{Duration, Instant};

use crate::{Config, LoopHooks, WatcherRegistry};

/// Deterministic stand-in for a dispatch loop.
///
/// Time is virtual: it only moves when [`iterate`](Self::iterate) simulates a
/// poll or [`advance`](Self::advance) is called, so every timestamp a watcher
/// sees is predictable. Each iteration runs the prepare pass with the
/// configured timeout, "blocks" for the given duration, then runs the check
/// pass.
///
/// # Warning
///
/// **Do not use in production.** Nothing is actually polled.
#[derive(Debug)]
pub struct FakeLoop {
    registry: WatcherRegistry,
    origin: Instant,
    elapsed: Duration,
    timeout: Option<Duration>,
    iterations: usize,
}

impl FakeLoop {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            registry: WatcherRegistry::new(config),
            origin: Instant::now(),
            elapsed: Duration::ZERO,
            timeout: None,
            iterations: 0,
        }
    }

    pub fn registry(&self) -> &WatcherRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut WatcherRegistry {
        &mut self.registry
    }

    /// Current virtual time.
    pub fn now(&self) -> Instant {
        self.origin + self.elapsed
    }

    /// Timeout reported to prepare watchers from the next iteration on.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Move virtual time forward without running any pass.
    pub fn advance(&mut self, by: Duration) {
        self.elapsed += by;
    }

    /// Completed iterations.
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Run one prepare, poll, check cycle where the poll blocks for `blocked`.
    pub fn iterate(&mut self, blocked: Duration) {
        let now = self.now();
        self.run_prepare_phase(now, self.timeout);
        self.advance(blocked);
        let now = self.now();
        self.run_check_phase(now);
        self.iterations += 1;
    }

    /// Run `n` iterations, each blocking for `blocked`.
    pub fn run(&mut self, n: usize, blocked: Duration) {
        for _ in 0..n {
            self.iterate(blocked);
        }
    }
}

impl Default for FakeLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopHooks for FakeLoop {
    fn run_prepare_phase(&mut self, now: Instant, timeout: Option<Duration>) {
        self.registry.run_prepare_phase(now, timeout);
    }

    fn run_check_phase(&mut self, now: Instant) {
        self.registry.run_check_phase(now);
    }

    fn teardown(&mut self) {
        self.registry.teardown();
    }
}
