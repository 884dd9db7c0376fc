use crate::{LoopId, Watcher};

/// The single error type for all evwatch operations.
///
/// Every variant reports caller misuse of a watcher handle or of a torn-down
/// registry. Running out of memory while registering is not represented: the
/// allocation failure aborts the process and leaves nothing to unwind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Watcher {0} was already released")]
    StaleWatcher(Watcher),

    #[error("Watcher {watcher} belongs to loop {}, not {registry}", .watcher.owning_loop())]
    ForeignWatcher { watcher: Watcher, registry: LoopId },

    #[error("The watcher registry has been torn down")]
    TornDown,
}

impl Error {
    /// Returns the watcher handle this error is about, if any.
    pub fn watcher(&self) -> Option<Watcher> {
        match self {
            Error::StaleWatcher(w) => Some(*w),
            Error::ForeignWatcher { watcher, .. } => Some(*watcher),
            Error::TornDown => None,
        }
    }
}
