use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
};

use crate::{
    Callback, Config, Error, InvocationContext, LoopId, PanicPolicy, Phase, Result, Watcher,
    WatcherScope,
};

struct Entry {
    generation: u32,
    // `None` while the callback is being invoked.
    callback: Option<Callback>,
}

/// Registry of prepare and check watchers owned by one dispatch loop.
///
/// The registry keeps one ordered sequence of watchers per [`Phase`]. Watchers
/// are invoked in registration order on every pass of their phase until they
/// are released. Callbacks may register and release watchers of either phase
/// while a pass is running:
///
/// - a watcher released mid-pass is never invoked later in that pass,
/// - a watcher registered mid-pass first runs on the next pass of its phase,
/// - survivors keep their relative order.
///
/// The loop drives the registry through [`LoopHooks`](crate::LoopHooks).
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use evwatch::{LoopHooks, WatcherRegistry};
///
/// let mut registry = WatcherRegistry::default();
///
/// let watcher = registry.add_prepare(|_scope, ctx| {
///     println!("about to poll for {:?}", ctx.timeout());
/// })?;
///
/// registry.run_prepare_phase(Instant::now(), Some(Duration::from_millis(10)));
/// registry.release(watcher)?;
/// # Ok::<(), evwatch::Error>(())
/// ```
pub struct WatcherRegistry {
    id: LoopId,
    config: Config,
    slots: Vec<Option<Entry>>,
    generations: Vec<u32>, // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    order: [Vec<Watcher>; 2],
    live: [usize; 2],
    running: Option<Phase>,
    needs_compaction: [bool; 2],
    torn_down: bool,
}

impl WatcherRegistry {
    /// Create an empty registry for a new loop.
    pub fn new(config: Config) -> Self {
        let capacity = config.prepare_capacity() + config.check_capacity();
        Self {
            id: LoopId::new(),
            slots: Vec::with_capacity(capacity),
            generations: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            order: [
                Vec::with_capacity(config.prepare_capacity()),
                Vec::with_capacity(config.check_capacity()),
            ],
            live: [0, 0],
            running: None,
            needs_compaction: [false, false],
            torn_down: false,
            config,
        }
    }

    /// Returns the id of the loop owning this registry.
    #[inline]
    pub fn loop_id(&self) -> LoopId {
        self.id
    }

    /// Returns the configuration this registry was created with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register a watcher to run just before the loop polls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TornDown`] if the loop has already been torn down.
    pub fn add_prepare<F>(&mut self, callback: F) -> Result<Watcher>
    where
        F: FnMut(&mut WatcherScope<'_>, &InvocationContext) + 'static,
    {
        self.register(Phase::Prepare, callback)
    }

    /// Register a watcher to run just after the poll returns, before dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TornDown`] if the loop has already been torn down.
    pub fn add_check<F>(&mut self, callback: F) -> Result<Watcher>
    where
        F: FnMut(&mut WatcherScope<'_>, &InvocationContext) + 'static,
    {
        self.register(Phase::Check, callback)
    }

    /// Append a new live watcher to the tail of `phase`'s sequence.
    ///
    /// When called from inside a pass of the same phase, the new watcher first
    /// runs on the next pass.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TornDown`] if the loop has already been torn down.
    pub fn register<F>(&mut self, phase: Phase, callback: F) -> Result<Watcher>
    where
        F: FnMut(&mut WatcherScope<'_>, &InvocationContext) + 'static,
    {
        if self.torn_down {
            tracing::warn!(loop_id = %self.id, %phase, "watcher registered after teardown");
            return Err(Error::TornDown);
        }
        let watcher = self.insert(phase, Box::new(callback));
        tracing::trace!(loop_id = %self.id, %watcher, "watcher registered");
        Ok(watcher)
    }

    fn insert(&mut self, phase: Phase, callback: Callback) -> Watcher {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx] + 1;
            self.generations[idx] = generation;
            (idx, generation)
        } else {
            self.slots.push(None);
            self.generations.push(1);
            (self.slots.len() - 1, 1)
        };
        self.slots[idx] = Some(Entry {
            generation,
            callback: Some(callback),
        });

        let watcher = Watcher::new(self.id, phase, idx as u32, generation);
        self.order[phase.index()].push(watcher);
        self.live[phase.index()] += 1;
        watcher
    }

    /// Deregister a watcher and drop its callback.
    ///
    /// Safe to call at any point, including from the watcher's own callback or
    /// from another watcher's callback during a pass over the same phase.
    ///
    /// # Errors
    ///
    /// Releasing is not idempotent. A second release of the same handle returns
    /// [`Error::StaleWatcher`], a handle from another loop returns
    /// [`Error::ForeignWatcher`], and any release after teardown returns
    /// [`Error::TornDown`].
    pub fn release(&mut self, watcher: Watcher) -> Result<()> {
        if let Err(e) = self.validate(watcher) {
            tracing::warn!(loop_id = %self.id, %watcher, error = %e, "invalid watcher release");
            return Err(e);
        }
        self.remove(watcher);
        tracing::trace!(loop_id = %self.id, %watcher, "watcher released");
        Ok(())
    }

    fn validate(&self, watcher: Watcher) -> Result<()> {
        if self.torn_down {
            return Err(Error::TornDown);
        }
        if watcher.owning_loop() != self.id {
            return Err(Error::ForeignWatcher {
                watcher,
                registry: self.id,
            });
        }
        if !self.is_alive(watcher) {
            return Err(Error::StaleWatcher(watcher));
        }
        Ok(())
    }

    // Caller guarantees `watcher` is live.
    fn remove(&mut self, watcher: Watcher) {
        self.free_slot(watcher.slot());

        let phase = watcher.phase().index();
        self.live[phase] -= 1;
        if self.running.is_some() {
            // The pass cursor indexes into `order`; only compact once it is done.
            self.needs_compaction[phase] = true;
        } else if let Some(pos) = self.order[phase].iter().position(|w| *w == watcher) {
            self.order[phase].remove(pos);
        }
    }

    fn free_slot(&mut self, idx: usize) {
        self.slots[idx] = None;
        // A slot whose generation is exhausted is retired, so stale handles never alias.
        if self.generations[idx] < u32::MAX {
            self.free_list.push(idx);
        }
    }

    /// Returns `true` if `watcher` was issued by this registry and is not released.
    pub fn is_alive(&self, watcher: Watcher) -> bool {
        self.owns(watcher)
            && self
                .slots
                .get(watcher.slot())
                .and_then(Option::as_ref)
                .is_some_and(|e| e.generation == watcher.generation())
    }

    /// Returns `true` if `watcher` was issued by this registry, live or not.
    pub fn owns(&self, watcher: Watcher) -> bool {
        watcher.owning_loop() == self.id
    }

    /// Number of live watchers registered for `phase`.
    pub fn len(&self, phase: Phase) -> usize {
        self.live[phase.index()]
    }

    /// Returns `true` if no watcher of either phase is live.
    pub fn is_empty(&self) -> bool {
        self.live.iter().all(|n| *n == 0)
    }

    /// Live watchers of `phase`, in invocation order.
    pub fn watchers(&self, phase: Phase) -> impl Iterator<Item = Watcher> + '_ {
        self.order[phase.index()]
            .iter()
            .copied()
            .filter(|w| self.is_alive(*w))
    }

    /// The phase whose pass is currently running, if any.
    pub fn current_phase(&self) -> Option<Phase> {
        self.running
    }

    /// Returns `true` once [`LoopHooks::teardown`](crate::LoopHooks::teardown) has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Invoke every live watcher of `phase`, in registration order.
    ///
    /// The same `ctx` is handed to every callback. When `phase` is
    /// [`Phase::Check`] the context is rebuilt without a timeout, whatever `ctx`
    /// carried.
    ///
    /// The walk covers the watchers registered when the pass starts. Each one
    /// is looked up again right before its turn, so a watcher released by an
    /// earlier callback of the pass is skipped.
    pub fn run_phase(&mut self, phase: Phase, ctx: &InvocationContext) {
        let ctx = ctx.for_phase(phase);
        let end = self.order[phase.index()].len();
        self.running = Some(phase);
        tracing::trace!(
            loop_id = %self.id,
            %phase,
            watchers = self.live[phase.index()],
            timeout = ?ctx.timeout(),
            "pass started"
        );

        let mut invoked = 0_usize;
        for cursor in 0..end {
            let watcher = self.order[phase.index()][cursor];
            let Some(mut callback) = self.take_callback(watcher) else {
                continue;
            };

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                let mut scope = WatcherScope::new(self, watcher);
                callback(&mut scope, &ctx);
            }));
            invoked += 1;

            match result {
                Ok(()) => self.restore_callback(watcher, callback),
                Err(payload) => match self.config.panic_policy() {
                    PanicPolicy::Release => {
                        drop(callback);
                        tracing::error!(
                            loop_id = %self.id,
                            %watcher,
                            panic = panic_message(payload.as_ref()),
                            "watcher panicked, releasing"
                        );
                        if self.is_alive(watcher) {
                            self.remove(watcher);
                        }
                    }
                    PanicPolicy::Propagate => {
                        self.restore_callback(watcher, callback);
                        self.finish_pass(phase);
                        panic::resume_unwind(payload);
                    }
                },
            }
        }

        self.finish_pass(phase);
        tracing::trace!(loop_id = %self.id, %phase, invoked, "pass finished");
    }

    fn take_callback(&mut self, watcher: Watcher) -> Option<Callback> {
        self.slots
            .get_mut(watcher.slot())?
            .as_mut()
            .filter(|e| e.generation == watcher.generation())?
            .callback
            .take()
    }

    fn restore_callback(&mut self, watcher: Watcher, callback: Callback) {
        let entry = self
            .slots
            .get_mut(watcher.slot())
            .and_then(Option::as_mut)
            .filter(|e| e.generation == watcher.generation());
        // A watcher that released itself has no entry left; its callback drops here.
        if let Some(entry) = entry {
            entry.callback = Some(callback);
        }
    }

    fn finish_pass(&mut self, phase: Phase) {
        self.running = None;
        for phase in Phase::ALL {
            let idx = phase.index();
            if std::mem::take(&mut self.needs_compaction[idx]) {
                let mut order = std::mem::take(&mut self.order[idx]);
                order.retain(|w| self.is_alive(*w));
                self.order[idx] = order;
            }
        }
        debug_assert_eq!(self.order[phase.index()].len(), self.live[phase.index()]);
    }

    /// Release every remaining watcher of both phases without invoking them.
    ///
    /// Returns the number of watchers released. Handles of drained watchers are
    /// stale afterwards.
    pub fn drain(&mut self) -> usize {
        let released: usize = self.live.iter().sum();
        for idx in 0..self.slots.len() {
            if self.slots[idx].is_some() {
                self.free_slot(idx);
            }
        }
        for order in &mut self.order {
            order.clear();
        }
        self.live = [0, 0];
        self.needs_compaction = [false, false];
        tracing::debug!(loop_id = %self.id, released, "watchers drained");
        released
    }

    pub(crate) fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        let released = self.drain();
        self.torn_down = true;
        tracing::debug!(loop_id = %self.id, released, "watcher registry torn down");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}

impl Default for WatcherRegistry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Drop for WatcherRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("id", &format_args!("{}", self.id))
            .field("config", &self.config)
            .field("slots.len()", &self.slots.len())
            .field("free_list.len()", &self.free_list.len())
            .field("prepare", &self.live[Phase::Prepare.index()])
            .field("check", &self.live[Phase::Check.index()])
            .field("running", &self.running)
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        rc::Rc,
        time::{Duration, Instant},
    };

    use super::*;
    use crate::LoopHooks;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn push(
        log: &Log,
        label: &'static str,
    ) -> impl FnMut(&mut WatcherScope<'_>, &InvocationContext) + 'static {
        let log = log.clone();
        move |_: &mut WatcherScope<'_>, _: &InvocationContext| log.borrow_mut().push(label)
    }

    fn prepare(registry: &mut WatcherRegistry) {
        registry.run_prepare_phase(Instant::now(), Some(Duration::from_secs(1)));
    }

    fn check(registry: &mut WatcherRegistry) {
        registry.run_check_phase(Instant::now());
    }

    #[test]
    fn test_phases_invoke_in_registration_order() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        registry.add_prepare(push(&calls, "A")).unwrap();
        registry.add_check(push(&calls, "B")).unwrap();
        registry.add_prepare(push(&calls, "C")).unwrap();

        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A", "C"]);

        calls.borrow_mut().clear();
        check(&mut registry);
        assert_eq!(*calls.borrow(), ["B"]);
    }

    #[test]
    fn test_order_is_stable_across_passes() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        for label in ["1", "2", "3", "4"] {
            registry.add_prepare(push(&calls, label)).unwrap();
        }

        for _ in 0..3 {
            prepare(&mut registry);
        }
        assert_eq!(
            *calls.borrow(),
            ["1", "2", "3", "4", "1", "2", "3", "4", "1", "2", "3", "4"]
        );
    }

    #[test]
    fn test_release_keeps_survivor_order() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        let a = registry.add_prepare(push(&calls, "A")).unwrap();
        registry.add_prepare(push(&calls, "B")).unwrap();
        let c = registry.add_prepare(push(&calls, "C")).unwrap();
        registry.add_prepare(push(&calls, "D")).unwrap();

        registry.release(c).unwrap();
        registry.release(a).unwrap();
        registry.add_prepare(push(&calls, "E")).unwrap();

        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["B", "D", "E"]);
        assert_eq!(registry.len(Phase::Prepare), 3);
    }

    #[test]
    fn test_release_of_unvisited_watcher_mid_pass() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        let target = Rc::new(RefCell::new(None));

        let t = target.clone();
        let l = calls.clone();
        registry
            .add_prepare(move |scope, _| {
                l.borrow_mut().push("A");
                if let Some(c) = t.borrow_mut().take() {
                    scope.release(c).unwrap();
                }
            })
            .unwrap();
        let c = registry.add_prepare(push(&calls, "C")).unwrap();
        *target.borrow_mut() = Some(c);

        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A"]);
        assert!(!registry.is_alive(c));

        calls.borrow_mut().clear();
        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A"]);
    }

    #[test]
    fn test_release_self_mid_pass() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        registry.add_prepare(push(&calls, "A")).unwrap();
        let l = calls.clone();
        let once = registry
            .add_prepare(move |scope, _| {
                l.borrow_mut().push("once");
                scope.release_self().unwrap();
            })
            .unwrap();
        registry.add_prepare(push(&calls, "C")).unwrap();

        prepare(&mut registry);
        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A", "once", "C", "A", "C"]);
        assert_eq!(registry.release(once), Err(Error::StaleWatcher(once)));
    }

    #[test]
    fn test_release_of_visited_watcher_mid_pass() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        let a = registry.add_prepare(push(&calls, "A")).unwrap();
        let l = calls.clone();
        registry
            .add_prepare(move |scope, _| {
                l.borrow_mut().push("B");
                if scope.is_alive(a) {
                    scope.release(a).unwrap();
                }
            })
            .unwrap();
        registry.add_prepare(push(&calls, "C")).unwrap();

        prepare(&mut registry);
        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A", "B", "C", "B", "C"]);
    }

    #[test]
    fn test_registration_mid_pass_is_deferred() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        let l = calls.clone();
        let spawned = Rc::new(RefCell::new(false));
        let s = spawned.clone();
        registry
            .add_prepare(move |scope, _| {
                l.borrow_mut().push("A");
                if !*s.borrow() {
                    *s.borrow_mut() = true;
                    scope.add_prepare(push(&l, "late")).unwrap();
                    scope.add_check(push(&l, "late-check")).unwrap();
                }
            })
            .unwrap();

        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A"]);

        check(&mut registry);
        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A", "late-check", "A", "late"]);
    }

    #[test]
    fn test_reused_slot_mid_pass_is_not_invoked() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        let victim = Rc::new(RefCell::new(None));

        let v = victim.clone();
        let l = calls.clone();
        registry
            .add_prepare(move |scope, _| {
                l.borrow_mut().push("A");
                if let Some(w) = v.borrow_mut().take() {
                    scope.release(w).unwrap();
                    // Reuses the slot just freed, with a newer generation.
                    let fresh = scope.add_prepare(push(&l, "fresh")).unwrap();
                    assert_eq!(fresh.slot(), w.slot());
                    assert!(fresh.generation() > w.generation());
                }
            })
            .unwrap();
        let b = registry.add_prepare(push(&calls, "B")).unwrap();
        *victim.borrow_mut() = Some(b);

        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A"]);

        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["A", "A", "fresh"]);
    }

    #[test]
    fn test_prepare_pass_releases_and_reuses_check_slot() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        let victim = Rc::new(RefCell::new(None));

        registry.add_check(push(&calls, "Z")).unwrap();
        let x = registry.add_check(push(&calls, "X")).unwrap();
        *victim.borrow_mut() = Some(x);

        let v = victim.clone();
        let l = calls.clone();
        registry
            .add_prepare(move |scope, _| {
                if let Some(w) = v.borrow_mut().take() {
                    scope.release(w).unwrap();
                    let y = scope.add_check(push(&l, "Y")).unwrap();
                    assert_eq!(y.slot(), w.slot());
                    assert!(y.generation() > w.generation());
                }
            })
            .unwrap();

        prepare(&mut registry);
        assert!(calls.borrow().is_empty());
        assert!(!registry.is_alive(x));

        check(&mut registry);
        assert_eq!(*calls.borrow(), ["Z", "Y"]);
        assert_eq!(registry.watchers(Phase::Check).count(), 2);
        assert_eq!(registry.len(Phase::Check), 2);
    }

    #[test]
    fn test_exhausted_slot_is_retired() {
        let mut registry = WatcherRegistry::default();
        let worn = registry.add_prepare(|_, _| {}).unwrap();
        let idx = worn.slot();
        registry.release(worn).unwrap();

        // Fast-forward the slot to its last generation.
        registry.generations[idx] = u32::MAX - 1;
        let last = registry.add_prepare(|_, _| {}).unwrap();
        assert_eq!(last.slot(), idx);
        assert_eq!(last.generation(), u32::MAX);

        registry.release(last).unwrap();
        assert!(!registry.free_list.contains(&idx));

        let fresh = registry.add_prepare(|_, _| {}).unwrap();
        assert_ne!(fresh.slot(), idx);
        assert_eq!(registry.release(last), Err(Error::StaleWatcher(last)));
        assert_eq!(registry.release(worn), Err(Error::StaleWatcher(worn)));
    }

    #[test]
    fn test_drain_retires_exhausted_slots() {
        let mut registry = WatcherRegistry::default();
        let worn = registry.add_check(|_, _| {}).unwrap();
        registry.release(worn).unwrap();
        registry.generations[worn.slot()] = u32::MAX - 1;
        registry.add_check(|_, _| {}).unwrap();
        registry.add_check(|_, _| {}).unwrap();

        assert_eq!(registry.drain(), 2);
        assert_eq!(registry.free_list, [1]);
    }

    #[test]
    fn test_check_context_never_has_timeout() {
        let mut registry = WatcherRegistry::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        registry
            .add_check(move |_, ctx| s.borrow_mut().push(ctx.timeout()))
            .unwrap();

        let now = Instant::now();
        let stale = InvocationContext::prepare(now, Some(Duration::from_secs(5)));
        registry.run_prepare_phase(now, Some(Duration::from_secs(5)));
        registry.run_phase(Phase::Check, &stale);
        registry.run_check_phase(now);

        assert_eq!(*seen.borrow(), [None, None]);
    }

    #[test]
    fn test_one_context_per_pass() {
        let mut registry = WatcherRegistry::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..3 {
            let s = seen.clone();
            registry
                .add_prepare(move |_, ctx| s.borrow_mut().push(*ctx))
                .unwrap();
        }

        let now = Instant::now();
        registry.run_prepare_phase(now, Some(Duration::from_millis(20)));

        let seen = seen.borrow();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|c| *c == seen[0]));
        assert_eq!(seen[0].now(), now);
        assert_eq!(seen[0].timeout(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_callback_receives_own_handle() {
        let mut registry = WatcherRegistry::default();
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let w = registry
            .add_check(move |scope, _| *s.borrow_mut() = Some(scope.watcher()))
            .unwrap();

        check(&mut registry);
        assert_eq!(*seen.borrow(), Some(w));
        assert_eq!(w.owning_loop(), registry.loop_id());
        assert_eq!(w.phase(), Phase::Check);
    }

    #[test]
    fn test_double_release_is_rejected() {
        let mut registry = WatcherRegistry::default();
        let w = registry.add_prepare(|_, _| {}).unwrap();
        assert_eq!(registry.release(w), Ok(()));
        assert_eq!(registry.release(w), Err(Error::StaleWatcher(w)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_foreign_watcher_is_rejected() {
        let mut a = WatcherRegistry::default();
        let mut b = WatcherRegistry::default();
        let w = a.add_prepare(|_, _| {}).unwrap();

        assert!(!b.owns(w));
        assert_eq!(
            b.release(w),
            Err(Error::ForeignWatcher {
                watcher: w,
                registry: b.loop_id(),
            })
        );
        assert!(a.is_alive(w));
    }

    #[test]
    fn test_teardown_releases_without_invoking() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        let p = registry.add_prepare(push(&calls, "P")).unwrap();
        let c = registry.add_check(push(&calls, "C")).unwrap();

        registry.teardown();

        assert!(calls.borrow().is_empty());
        assert!(registry.is_empty());
        assert!(!registry.is_alive(p));
        assert!(!registry.is_alive(c));
        assert_eq!(registry.release(p), Err(Error::TornDown));
        assert_eq!(registry.release(c), Err(Error::TornDown));
        assert_eq!(registry.add_prepare(|_, _| {}), Err(Error::TornDown));

        prepare(&mut registry);
        check(&mut registry);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_drain_makes_handles_stale() {
        let mut registry = WatcherRegistry::default();
        let p = registry.add_prepare(|_, _| {}).unwrap();
        let c = registry.add_check(|_, _| {}).unwrap();

        assert_eq!(registry.drain(), 2);
        assert_eq!(registry.release(p), Err(Error::StaleWatcher(p)));
        assert_eq!(registry.release(c), Err(Error::StaleWatcher(c)));

        // Drain is not teardown: the registry keeps accepting watchers.
        let fresh = registry.add_prepare(|_, _| {}).unwrap();
        assert_ne!(fresh, p);
        assert_eq!(registry.len(Phase::Prepare), 1);
    }

    #[test]
    fn test_drop_drops_callbacks() {
        let token = Rc::new(());
        let mut registry = WatcherRegistry::default();
        let t = token.clone();
        registry
            .add_prepare(move |_, _| {
                let _ = &t;
            })
            .unwrap();
        assert_eq!(Rc::strong_count(&token), 2);

        drop(registry);
        assert_eq!(Rc::strong_count(&token), 1);
    }

    #[test]
    fn test_watchers_lists_live_handles_in_order() {
        let mut registry = WatcherRegistry::default();
        let a = registry.add_check(|_, _| {}).unwrap();
        let b = registry.add_check(|_, _| {}).unwrap();
        let c = registry.add_check(|_, _| {}).unwrap();
        registry.release(b).unwrap();

        let listed: Vec<_> = registry.watchers(Phase::Check).collect();
        assert_eq!(listed, [a, c]);
        assert_eq!(registry.watchers(Phase::Prepare).count(), 0);
    }

    #[test]
    fn test_current_phase_during_pass() {
        let mut registry = WatcherRegistry::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        registry
            .add_prepare(move |scope, _| s.borrow_mut().push(scope.registry().current_phase()))
            .unwrap();
        let s = seen.clone();
        registry
            .add_check(move |scope, _| s.borrow_mut().push(scope.registry().current_phase()))
            .unwrap();

        prepare(&mut registry);
        check(&mut registry);
        assert_eq!(*seen.borrow(), [Some(Phase::Prepare), Some(Phase::Check)]);
        assert_eq!(registry.current_phase(), None);
    }

    #[test]
    fn test_panic_release_policy_skips_offender() {
        let calls = log();
        let mut registry =
            WatcherRegistry::new(Config::default().with_panic_policy(PanicPolicy::Release));
        let l = calls.clone();
        let bad = registry
            .add_prepare(move |_, _| {
                l.borrow_mut().push("bad");
                panic!("watcher failure");
            })
            .unwrap();
        registry.add_prepare(push(&calls, "good")).unwrap();

        prepare(&mut registry);
        prepare(&mut registry);

        assert_eq!(*calls.borrow(), ["bad", "good", "good"]);
        assert!(!registry.is_alive(bad));
        assert_eq!(registry.len(Phase::Prepare), 1);
    }

    #[test]
    fn test_panic_propagate_policy_keeps_registry_consistent() {
        let calls = log();
        let mut registry = WatcherRegistry::default();
        let l = calls.clone();
        let flaky = registry
            .add_prepare(move |scope, _| {
                l.borrow_mut().push("flaky");
                if scope.registry().len(Phase::Prepare) > 1 {
                    panic!("watcher failure");
                }
            })
            .unwrap();
        let after = registry.add_prepare(push(&calls, "after")).unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| prepare(&mut registry)));
        assert!(result.is_err());
        assert_eq!(registry.current_phase(), None);
        assert!(registry.is_alive(flaky));

        registry.release(after).unwrap();
        prepare(&mut registry);
        assert_eq!(*calls.borrow(), ["flaky", "flaky"]);
    }
}
