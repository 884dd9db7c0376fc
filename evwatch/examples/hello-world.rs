use std::time::{Duration, Instant};

use evwatch::*;

fn main() -> Result {
    let mut registry = WatcherRegistry::default();

    // Runs before every poll, in registration order
    registry.add_prepare(|_scope, ctx| {
        println!("prepare: polling for at most {:?}", ctx.timeout());
    })?;

    // Runs once, then releases itself from inside its own callback
    registry.add_check(|scope, _ctx| {
        println!("check: first wakeup seen by {}", scope.watcher());
        let _ = scope.release_self();
    })?;

    // A stand-in for three iterations of a dispatch loop
    for i in 0..3 {
        println!("-- iteration {i}");
        registry.run_prepare_phase(Instant::now(), Some(Duration::from_millis(10)));
        std::thread::sleep(Duration::from_millis(10));
        registry.run_check_phase(Instant::now());
    }

    // Frees the prepare watcher that was never released explicitly
    registry.teardown();
    Ok(())
}
