use std::fmt;

use crate::{InvocationContext, LoopId, Phase, Result, Watcher, WatcherRegistry};

/// Registry access handed to a watcher callback while it runs.
///
/// Use it to:
/// - `watcher()`: retrieve the handle of the watcher being invoked
/// - `release_self()`: deregister that watcher; it will not run again
/// - `release(other)`: deregister any other watcher of the same loop
/// - `add_prepare(cb)` / `add_check(cb)`: register new watchers
/// - `registry()`: read-only introspection of the owning registry
///
/// Running passes is the loop's job, so the scope never exposes
/// [`WatcherRegistry::run_phase`].
pub struct WatcherScope<'a> {
    registry: &'a mut WatcherRegistry,
    watcher: Watcher,
}

impl<'a> WatcherScope<'a> {
    pub(crate) fn new(registry: &'a mut WatcherRegistry, watcher: Watcher) -> Self {
        Self { registry, watcher }
    }

    /// The watcher whose callback is running.
    #[inline]
    pub fn watcher(&self) -> Watcher {
        self.watcher
    }

    /// The phase being run.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.watcher.phase()
    }

    /// The loop the running watcher belongs to.
    #[inline]
    pub fn owning_loop(&self) -> LoopId {
        self.watcher.owning_loop()
    }

    /// Release the running watcher.
    ///
    /// The callback finishes normally; it is simply never invoked again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleWatcher`](crate::Error::StaleWatcher) if the watcher
    /// has already released itself during this call.
    pub fn release_self(&mut self) -> Result<()> {
        self.registry.release(self.watcher)
    }

    /// Release another watcher. See [`WatcherRegistry::release`].
    pub fn release(&mut self, watcher: Watcher) -> Result<()> {
        self.registry.release(watcher)
    }

    /// Returns `true` if `watcher` is registered with this loop and not released.
    pub fn is_alive(&self, watcher: Watcher) -> bool {
        self.registry.is_alive(watcher)
    }

    /// Register a prepare watcher. See [`WatcherRegistry::add_prepare`].
    pub fn add_prepare<F>(&mut self, callback: F) -> Result<Watcher>
    where
        F: FnMut(&mut WatcherScope<'_>, &InvocationContext) + 'static,
    {
        self.registry.add_prepare(callback)
    }

    /// Register a check watcher. See [`WatcherRegistry::add_check`].
    pub fn add_check<F>(&mut self, callback: F) -> Result<Watcher>
    where
        F: FnMut(&mut WatcherScope<'_>, &InvocationContext) + 'static,
    {
        self.registry.add_check(callback)
    }

    /// Read-only view of the owning registry.
    pub fn registry(&self) -> &WatcherRegistry {
        self.registry
    }
}

impl fmt::Debug for WatcherScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherScope")
            .field("watcher", &self.watcher)
            .finish_non_exhaustive()
    }
}
