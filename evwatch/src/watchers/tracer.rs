use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

use crate::{Result, Watcher, WatcherRegistry};

/// Watcher pair that logs each loop iteration to the `tracing` crate.
///
/// Log levels:
/// - `trace` - prepare pass (timestamp and requested timeout)
/// - `debug` - check pass (timestamp, time blocked in the poll and the timeout
///   requested by the preceding prepare pass; both `None` if there was none)
///
/// # Example
///
/// ```ignore
/// use evwatch::watchers::Tracer;
///
/// let [prepare, check] = Tracer::attach(&mut registry)?;
/// ```
#[derive(Debug)]
pub struct Tracer;

impl Tracer {
    /// Register the tracing watchers and return `[prepare, check]` handles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TornDown`](crate::Error::TornDown) if the registry has
    /// been torn down.
    pub fn attach(registry: &mut WatcherRegistry) -> Result<[Watcher; 2]> {
        // Set by prepare, consumed by the following check pass.
        let pending: Rc<Cell<Option<(Instant, Option<Duration>)>>> = Rc::new(Cell::new(None));

        let stash = pending.clone();
        let prepare = registry.add_prepare(move |scope, ctx| {
            stash.set(Some((ctx.now(), ctx.timeout())));
            tracing::trace!(
                loop_id = %scope.owning_loop(),
                now = ?ctx.now(),
                timeout = ?ctx.timeout(),
                "preparing to poll"
            );
        })?;

        let check = registry.add_check(move |scope, ctx| {
            let (blocked, requested) = poll_summary(&pending, ctx.now());
            tracing::debug!(
                loop_id = %scope.owning_loop(),
                now = ?ctx.now(),
                blocked = ?blocked,
                requested = ?requested,
                "poll returned"
            );
        })?;

        Ok([prepare, check])
    }
}

/// Time blocked since the stashed prepare pass and the timeout it requested.
fn poll_summary(
    pending: &Cell<Option<(Instant, Option<Duration>)>>,
    now: Instant,
) -> (Option<Duration>, Option<Duration>) {
    match pending.take() {
        Some((started, requested)) => (Some(now.saturating_duration_since(started)), requested),
        None => (None, None),
    }
}
