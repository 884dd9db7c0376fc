//! Test harness demonstration.
//!
//! Uses `FakeLoop` (virtual time, no real polling) and `Recorder` to check the
//! ordering guarantees of the registry, including a watcher that releases a
//! later watcher of the same phase during a pass.
//!
//! Run with `cargo run --example recorder --features test-harness`.

use std::{cell::RefCell, rc::Rc, time::Duration};

use evwatch::{
    Phase, Watcher,
    testing::{FakeLoop, Recorder},
};

fn main() -> evwatch::Result {
    let recorder = Recorder::new();
    let mut fake = FakeLoop::new();
    fake.set_timeout(Some(Duration::from_secs(1)));

    let victim: Rc<RefCell<Option<Watcher>>> = Rc::new(RefCell::new(None));
    let target = victim.clone();
    let mut record = recorder.callback("A");
    fake.registry_mut().add_prepare(move |scope, ctx| {
        record(&mut *scope, ctx);
        if let Some(w) = target.borrow_mut().take() {
            let _ = scope.release(w);
        }
    })?;
    fake.registry_mut().add_check(recorder.callback("B"))?;
    let c = fake.registry_mut().add_prepare(recorder.callback("C"))?;

    fake.iterate(Duration::from_secs(1));
    println!("first iteration:  {:?}", recorder.labels());
    assert_eq!(recorder.labels_in(Phase::Prepare), ["A", "C"]);
    assert_eq!(recorder.labels_in(Phase::Check), ["B"]);

    recorder.clear();
    *victim.borrow_mut() = Some(c);
    fake.iterate(Duration::from_secs(1));
    println!("second iteration: {:?}", recorder.labels());
    assert_eq!(recorder.labels(), ["A", "B"]);

    for entry in recorder.entries() {
        println!(
            "{:<2} {:<8} timeout={:?}",
            entry.label,
            entry.phase.to_string(),
            entry.timeout
        );
    }
    Ok(())
}
