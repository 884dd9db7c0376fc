use std::fmt;

/// One of the two hook points of a loop iteration.
///
/// | Phase | When it runs | Context carries a timeout |
/// |-------|--------------|---------------------------|
/// | [`Prepare`](Self::Prepare) | Just before the loop blocks polling for activity | Yes, if timed activity is pending |
/// | [`Check`](Self::Check) | Just after the poll returns, before ready events are dispatched | Never |
///
/// Every prepare pass of an iteration finishes before the check pass of that
/// same iteration begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// Pre-poll hook.
    Prepare,

    /// Post-poll, pre-dispatch hook.
    Check,
}

impl Phase {
    /// Both phases, in the order they run within one iteration.
    pub const ALL: [Phase; 2] = [Phase::Prepare, Phase::Check];

    /// Returns `true` if this is the [`Prepare`](Self::Prepare) phase.
    pub fn is_prepare(&self) -> bool {
        matches!(self, Phase::Prepare)
    }

    /// Returns `true` if this is the [`Check`](Self::Check) phase.
    pub fn is_check(&self) -> bool {
        matches!(self, Phase::Check)
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Phase::Prepare => 0,
            Phase::Check => 1,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Prepare => write!(f, "prepare"),
            Phase::Check => write!(f, "check"),
        }
    }
}
