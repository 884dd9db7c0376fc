#![cfg_attr(docsrs, feature(doc_cfg))]
//! # evwatch
//!
//! Prepare/check watcher hooks for a cooperative event-dispatch loop.
//!
//! A dispatch loop spends each iteration computing a poll timeout, blocking in
//! its poll, then dispatching whatever became ready. evwatch lets outside code
//! observe two points of that iteration without touching the activity itself:
//!
//! - **prepare** - just before the loop blocks, with the current time and the
//!   timeout it is about to poll with
//! - **check** - just after the poll returns, before anything is dispatched
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::{Duration, Instant};
//! use evwatch::{LoopHooks, WatcherRegistry};
//!
//! let mut registry = WatcherRegistry::default();
//!
//! registry.add_prepare(|_scope, ctx| {
//!     println!("polling for at most {:?}", ctx.timeout());
//! })?;
//! registry.add_check(|scope, _ctx| {
//!     println!("woke up; {} will not run again", scope.watcher());
//!     let _ = scope.release_self();
//! })?;
//!
//! // Inside the loop:
//! let now = Instant::now();
//! registry.run_prepare_phase(now, Some(Duration::from_millis(5)));
//! // ... poll ...
//! registry.run_check_phase(Instant::now());
//!
//! // When the loop is freed:
//! registry.teardown();
//! # Ok::<(), evwatch::Error>(())
//! ```
//!
//! ## Core Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WatcherRegistry`] | Owns the watchers of one loop and runs the passes |
//! | [`Watcher`] | Copyable handle to a registered watcher |
//! | [`WatcherScope`] | Given to callbacks: own handle, register/release access |
//! | [`InvocationContext`] | Per-pass timestamp and (prepare only) poll timeout |
//! | [`LoopHooks`] | The calls a loop makes into its registry |
//! | [`Phase`] | `Prepare` or `Check` |
//! | [`Config`] | Capacity and [`PanicPolicy`] |
//!
//! ## Ordering Guarantees
//!
//! Within a phase, watchers run in registration order on every pass. A
//! callback may release any watcher (itself included) or register new ones:
//! released watchers never run again, not even later in the same pass, and
//! watchers registered mid-pass first run on the next pass of their phase.
//!
//! ## Features
//!
//! - **`serde`** - Serialize/deserialize [`Config`], [`Phase`], [`PanicPolicy`] and [`LoopId`]
//! - **`test-harness`** - [`testing::Recorder`] and [`testing::FakeLoop`] for asserting on passes
//!
//! ## Examples
//!
//! See the `examples/` directory:
//!
//! - `hello-world.rs`  - Registering and releasing watchers
//! - `poll-timing.rs`  - Measuring time blocked versus requested timeout
//! - `recorder.rs`  - Test harness demonstration

mod config;
mod error;
mod hooks;
mod invocation_context;
mod loop_id;
mod panic_policy;
mod phase;
mod registry;
mod scope;
mod watcher;

pub mod watchers;

#[cfg(feature = "test-harness")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-harness")))]
pub mod testing;

pub use config::Config;
pub use error::Error;
pub use hooks::LoopHooks;
pub use invocation_context::InvocationContext;
pub use loop_id::LoopId;
pub use panic_policy::PanicPolicy;
pub use phase::Phase;
pub use registry::WatcherRegistry;
pub use scope::WatcherScope;
pub use watcher::{Callback, Watcher};

/// Convenience alias for `Result<T, evwatch::Error>`.
pub type Result<T = ()> = std::result::Result<T, Error>;
