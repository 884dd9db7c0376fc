use std::time::{Duration, Instant};

use crate::Phase;

/// Per-pass information handed to every watcher callback.
///
/// The loop builds exactly one context per phase pass, so every callback of a
/// pass sees the same `now` and the same `timeout`. Comparing the `now` seen in
/// prepare with the `now` seen in the following check gives the time actually
/// spent blocked, which can be set against the timeout the loop asked for.
///
/// The value is only borrowed for the duration of a callback; copy the fields
/// out if they are needed later.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use evwatch::InvocationContext;
///
/// let now = Instant::now();
/// let prepare = InvocationContext::prepare(now, Some(Duration::from_secs(1)));
/// assert_eq!(prepare.timeout(), Some(Duration::from_secs(1)));
///
/// let check = InvocationContext::check(now + Duration::from_secs(1));
/// assert_eq!(check.timeout(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationContext {
    phase: Phase,
    now: Instant,
    timeout: Option<Duration>,
}

impl InvocationContext {
    /// Context for a prepare pass.
    ///
    /// `timeout` is the duration the loop is about to pass to its poll, or `None`
    /// if no timed activity is pending and the poll may block indefinitely.
    pub fn prepare(now: Instant, timeout: Option<Duration>) -> Self {
        Self {
            phase: Phase::Prepare,
            now,
            timeout,
        }
    }

    /// Context for a check pass. Check contexts never carry a timeout.
    pub fn check(now: Instant) -> Self {
        Self {
            phase: Phase::Check,
            now,
            timeout: None,
        }
    }

    /// Re-targets this context at `phase`, dropping the timeout for check.
    pub(crate) fn for_phase(self, phase: Phase) -> Self {
        match phase {
            Phase::Prepare => Self {
                phase,
                ..self
            },
            Phase::Check => Self::check(self.now),
        }
    }

    /// The phase this context was built for.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The loop's current (possibly cached) time.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// The poll timeout computed by the loop. Always `None` in the check phase.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
