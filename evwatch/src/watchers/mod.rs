//! Ready-to-use watcher implementations.
//!
//! Each type here installs a prepare/check watcher pair on a registry and
//! returns both handles, so the pair can be released together later.
//!
//! # Available Watchers
//!
//! - [`Tracer`] - Logs every pass via the `tracing` crate
//! - [`PollTimer`] - Compares the requested poll timeout with the time actually blocked
//!
//! # Example
//!
//! ```rust
//! use evwatch::{WatcherRegistry, watchers::Tracer};
//!
//! let mut registry = WatcherRegistry::default();
//! let [prepare, check] = Tracer::attach(&mut registry)?;
//! # let _ = (prepare, check);
//! # Ok::<(), evwatch::Error>(())
//! ```

mod tracer;
pub use tracer::Tracer;

mod poll_timer;
pub use poll_timer::{PollSample, PollTimer};
