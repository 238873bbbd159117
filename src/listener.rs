// Listener boundary - the device-facing component driven by the daemon loop

use std::thread;
use std::time::Duration;

/// One listen/dispatch cycle of the device-facing backend.
///
/// The daemon calls [`step`](Listener::step) once per loop iteration and
/// checks the shutdown flag in between, so implementations must return
/// within a bounded time rather than block indefinitely. Error handling
/// is the backend's own business; nothing it does ends the loop.
pub trait Listener {
    fn step(&mut self);
}

/// Stand-in backend used by the shipped binary: sleeps one poll interval
/// per cycle. Real device backends plug in through the listener factory
/// passed to [`Daemon::run`](crate::daemon::Daemon::run), which hands
/// them the resolved config and identity.
#[derive(Debug)]
pub struct IdleListener {
    poll: Duration,
}

impl IdleListener {
    pub fn new(poll: Duration) -> Self {
        Self { poll }
    }
}

impl Default for IdleListener {
    fn default() -> Self {
        Self::new(Duration::from_millis(200))
    }
}

impl Listener for IdleListener {
    fn step(&mut self) {
        thread::sleep(self.poll);
    }
}
