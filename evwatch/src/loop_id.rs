use std::fmt;

use uuid::Uuid;

/// Identity of the loop a [`WatcherRegistry`](crate::WatcherRegistry) belongs to.
///
/// Every registry draws a fresh random id on creation, and every
/// [`Watcher`](crate::Watcher) it hands out carries that id back. Comparing the
/// two is how a registry recognises handles issued by some other loop. Ids can
/// only be drawn, never built from a raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopId(u128);

impl LoopId {
    /// Draw a new random (v4) id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().as_u128())
    }
}

impl Default for LoopId {
    fn default() -> Self {
        Self::new()
    }
}

/// Hyphenated uuid form, e.g. `67e55044-10b1-426f-9247-bb680e5fe0c8`.
impl fmt::Display for LoopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Uuid::from_u128(self.0).hyphenated(), f)
    }
}
