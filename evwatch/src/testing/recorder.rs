use std::{cell::RefCell, rc::Rc};

use crate::{InvocationContext, Phase, WatcherScope, testing::Invocation};

/// Shared log of watcher invocations.
///
/// Hand out callbacks with [`callback`](Self::callback), run some passes, then
/// query the log. Clones share the same log.
///
/// ```rust
/// use evwatch::testing::{FakeLoop, Recorder};
///
/// let recorder = Recorder::new();
/// let mut fake = FakeLoop::new();
/// fake.registry_mut().add_prepare(recorder.callback("A"))?;
/// fake.registry_mut().add_check(recorder.callback("B"))?;
///
/// fake.iterate(std::time::Duration::from_millis(5));
/// assert_eq!(recorder.labels(), ["A", "B"]);
/// # Ok::<(), evwatch::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Rc<RefCell<Vec<Invocation>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A watcher callback that appends an [`Invocation`] tagged with `label`.
    pub fn callback(
        &self,
        label: &'static str,
    ) -> impl FnMut(&mut WatcherScope<'_>, &InvocationContext) + 'static {
        let entries = self.entries.clone();
        move |scope: &mut WatcherScope<'_>, ctx: &InvocationContext| {
            entries.borrow_mut().push(Invocation {
                label,
                watcher: scope.watcher(),
                phase: ctx.phase(),
                now: ctx.now(),
                timeout: ctx.timeout(),
            });
        }
    }

    /// All recorded invocations, oldest first.
    pub fn entries(&self) -> Vec<Invocation> {
        self.entries.borrow().clone()
    }

    /// Labels of all recorded invocations, oldest first.
    pub fn labels(&self) -> Vec<&'static str> {
        self.entries.borrow().iter().map(|e| e.label).collect()
    }

    /// Labels of the invocations recorded during `phase` passes.
    pub fn labels_in(&self, phase: Phase) -> Vec<&'static str> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.phase == phase)
            .map(|e| e.label)
            .collect()
    }

    /// How many times the callback tagged `label` ran.
    pub fn count(&self, label: &str) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.label == label)
            .count()
    }

    /// Returns `true` if `first` ran at least once and every run of `second`
    /// came after the first run of `first`.
    pub fn ran_before(&self, first: &str, second: &str) -> bool {
        let entries = self.entries.borrow();
        let Some(a) = entries.iter().position(|e| e.label == first) else {
            return false;
        };
        entries
            .iter()
            .position(|e| e.label == second)
            .is_none_or(|b| a < b)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
