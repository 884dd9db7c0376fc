use std::fmt;

/// Controls what happens when a watcher callback panics during a pass.
///
/// The registry always catches the unwind first so that its own bookkeeping
/// (the callback slot being run, the pass in progress) is restored before
/// anything else happens. The policy decides what comes next.
///
/// | Policy | On panic | Use case |
/// |--------|----------|----------|
/// | [`Propagate`](Self::Propagate) | Resume the panic into the loop | Default; a broken watcher is a bug |
/// | [`Release`](Self::Release) | Log, release the watcher, continue the pass | Optional third-party instrumentation |
///
/// # Example
///
/// ```rust
/// use evwatch::{Config, PanicPolicy, WatcherRegistry};
///
/// let registry = WatcherRegistry::new(Config::default().with_panic_policy(PanicPolicy::Release));
/// assert!(registry.config().panic_policy().is_release());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PanicPolicy {
    /// Re-raise the panic once the registry is consistent again.
    ///
    /// The watcher stays registered; the rest of the pass does not run.
    #[default]
    Propagate,

    /// Release the panicking watcher and carry on with the rest of the pass.
    ///
    /// The panic is logged at `error` level and the watcher is never invoked
    /// again. Its handle becomes stale like any explicitly released one.
    Release,
}

impl PanicPolicy {
    /// Returns `true` if this is the [`Propagate`](Self::Propagate) policy.
    pub fn is_propagate(&self) -> bool {
        matches!(self, PanicPolicy::Propagate)
    }

    /// Returns `true` if this is the [`Release`](Self::Release) policy.
    pub fn is_release(&self) -> bool {
        matches!(self, PanicPolicy::Release)
    }
}

impl fmt::Display for PanicPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanicPolicy::Propagate => write!(f, "Propagate"),
            PanicPolicy::Release => write!(f, "Release"),
        }
    }
}
