//! Test utilities for driving passes and asserting on watcher invocations.
//!
//! Enable with the `test-harness` feature:
//!
//! ```toml
//! [dev-dependencies]
//! evwatch = { version = "0.1", features = ["test-harness"] }
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use evwatch::{Phase, testing::{FakeLoop, Recorder}};
//!
//! let recorder = Recorder::new();
//! let mut fake = FakeLoop::new();
//! fake.registry_mut().add_prepare(recorder.callback("A"))?;
//! fake.registry_mut().add_check(recorder.callback("B"))?;
//! fake.registry_mut().add_prepare(recorder.callback("C"))?;
//!
//! fake.set_timeout(Some(Duration::from_millis(50)));
//! fake.iterate(Duration::from_millis(50));
//!
//! assert_eq!(recorder.labels_in(Phase::Prepare), ["A", "C"]);
//! assert_eq!(recorder.labels_in(Phase::Check), ["B"]);
//! assert!(recorder.ran_before("C", "B"));
//! # Ok::<(), evwatch::Error>(())
//! ```
//!
//! # Note
//!
//! [`Recorder`] uses `Rc` internally and is `!Send`, like the registry's
//! callbacks. It is meant for the single thread driving the loop.

mod fake_loop;
mod invocation;
mod recorder;

pub use fake_loop::FakeLoop;
pub use invocation::Invocation;
pub use recorder::Recorder;
