use std::time::{Duration, Instant};

use crate::{Phase, Watcher};

/// One recorded watcher invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Label given to [`Recorder::callback`](super::Recorder::callback).
    pub label: &'static str,
    /// The watcher that ran.
    pub watcher: Watcher,
    /// Phase of the pass.
    pub phase: Phase,
    /// `now` from the pass context.
    pub now: Instant,
    /// `timeout` from the pass context.
    pub timeout: Option<Duration>,
}
