use crate::PanicPolicy;

/// Configuration for a [`WatcherRegistry`](crate::WatcherRegistry).
///
/// Use the builder methods to customize, or [`Default`] for sensible defaults.
///
/// # Examples
///
/// ```rust
/// use evwatch::{Config, PanicPolicy};
///
/// let config = Config::default()
///     .with_prepare_capacity(16)                  // Preallocate prepare slots
///     .with_check_capacity(4)                     // Preallocate check slots
///     .with_panic_policy(PanicPolicy::Release);   // Drop watchers that panic
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Number of prepare watchers the registry has room for before growing.
    /// Default: 8
    prepare_capacity: usize,

    /// Number of check watchers the registry has room for before growing.
    /// Default: 8
    check_capacity: usize,

    /// What to do when a watcher callback panics.
    /// Default: [`PanicPolicy::Propagate`]
    panic_policy: PanicPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            prepare_capacity: 8,
            check_capacity: 8,
            panic_policy: PanicPolicy::default(),
        }
    }
}

impl Config {
    /// Set the initial capacity for prepare watchers.
    pub fn with_prepare_capacity(mut self, capacity: usize) -> Self {
        self.prepare_capacity = capacity;
        self
    }

    /// Returns the initial capacity for prepare watchers.
    pub fn prepare_capacity(&self) -> usize {
        self.prepare_capacity
    }

    /// Set the initial capacity for check watchers.
    pub fn with_check_capacity(mut self, capacity: usize) -> Self {
        self.check_capacity = capacity;
        self
    }

    /// Returns the initial capacity for check watchers.
    pub fn check_capacity(&self) -> usize {
        self.check_capacity
    }

    /// Set the policy applied when a watcher callback panics.
    ///
    /// See [`PanicPolicy`] for the available behaviours.
    pub fn with_panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.panic_policy = policy;
        self
    }

    /// Returns the policy applied when a watcher callback panics.
    pub fn panic_policy(&self) -> PanicPolicy {
        self.panic_policy
    }
}
