//! Poll timing example.
//!
//! A toy loop sleeps in place of a real poll. The `PollTimer` watcher pair
//! compares the timeout handed to prepare watchers with the time that actually
//! passed before check watchers ran, and the `Tracer` pair logs both passes.

use std::time::{Duration, Instant};

use evwatch::{
    Config, LoopHooks, PanicPolicy, WatcherRegistry,
    watchers::{PollTimer, Tracer},
};

/// Minimal loop: one pending timer, polled by sleeping.
struct SleepLoop {
    registry: WatcherRegistry,
    deadline: Option<Instant>,
}

impl SleepLoop {
    fn new() -> Self {
        Self {
            registry: WatcherRegistry::new(
                Config::default().with_panic_policy(PanicPolicy::Release),
            ),
            deadline: None,
        }
    }

    fn schedule(&mut self, after: Duration) {
        self.deadline = Some(Instant::now() + after);
    }

    fn run_once(&mut self) {
        let now = Instant::now();
        let timeout = self.deadline.map(|d| d.saturating_duration_since(now));
        self.registry.run_prepare_phase(now, timeout);

        // Sleeping overshoots a little, which is what the timer measures.
        std::thread::sleep(timeout.unwrap_or_default() + Duration::from_millis(2));

        self.registry.run_check_phase(Instant::now());
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            self.deadline = None;
            println!("timer fired");
        }
    }
}

impl Drop for SleepLoop {
    fn drop(&mut self) {
        self.registry.teardown();
    }
}

fn run() -> evwatch::Result {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut event_loop = SleepLoop::new();
    let timer = PollTimer::new().with_tolerance(Duration::from_millis(1));
    timer.attach(&mut event_loop.registry)?;
    let [prepare, check] = Tracer::attach(&mut event_loop.registry)?;

    for ms in [20, 50, 10] {
        event_loop.schedule(Duration::from_millis(ms));
        event_loop.run_once();
    }

    // Stop tracing but keep timing
    event_loop.registry.release(prepare)?;
    event_loop.registry.release(check)?;
    event_loop.schedule(Duration::from_millis(5));
    event_loop.run_once();

    println!(
        "samples: {}, overshoots: {}, blocked: {:?}, last: {:?}",
        timer.samples(),
        timer.overshoots(),
        timer.total_blocked(),
        timer.last()
    );
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error while executing example: {e}");
    }
}
