use std::fmt;

use crate::{InvocationContext, LoopId, Phase, WatcherScope};

/// Boxed watcher callback.
///
/// Receives a [`WatcherScope`] (its own handle plus access to the registry) and
/// the [`InvocationContext`] shared by every callback of the current pass.
pub type Callback = Box<dyn FnMut(&mut WatcherScope<'_>, &InvocationContext)>;

/// Handle to a registered watcher.
///
/// Returned by [`WatcherRegistry::add_prepare`](crate::WatcherRegistry::add_prepare)
/// and [`WatcherRegistry::add_check`](crate::WatcherRegistry::add_check). The handle
/// is a small copyable id: a slot index and a generation into the registry's
/// arena, the phase tag, and the id of the owning loop.
///
/// ## Liveness
///
/// A handle is live from registration until it is released, either explicitly
/// through [`WatcherRegistry::release`](crate::WatcherRegistry::release) or by the
/// loop tearing the registry down. Released handles never alias a newer watcher:
/// when a freed slot is reused its generation is bumped, so the stale handle no
/// longer matches and further use is reported as misuse.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Watcher {
    owner: LoopId,
    phase: Phase,
    slot: u32,
    generation: u32,
}

impl Watcher {
    pub(crate) const fn new(owner: LoopId, phase: Phase, slot: u32, generation: u32) -> Self {
        Self {
            owner,
            phase,
            slot,
            generation,
        }
    }

    /// Returns the id of the loop this watcher was registered with.
    #[inline]
    pub fn owning_loop(&self) -> LoopId {
        self.owner
    }

    /// Returns the phase this watcher runs in.
    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub(crate) const fn slot(&self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub(crate) const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("owner", &format_args!("{}", self.owner))
            .field("phase", &self.phase)
            .field("slot", &self.slot)
            .field("generation", &self.generation)
            .finish()
    }
}

impl fmt::Display for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}.{}", self.phase, self.slot, self.generation)
    }
}
