// Cooperative shutdown - signal handlers flip one atomic flag, nothing else

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Process-wide shutdown flag, set exactly once (false to true) from
/// signal context and polled by the main loop. Clones share one cell.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the daemon to shut down. Safe from any context; never reset.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Has shutdown been requested?
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Register SIGINT and SIGTERM handlers that set `flag`.
///
/// The handler's only effect is the atomic store; anything beyond that
/// (I/O, allocation, locking) is off-limits in signal context, so all
/// reporting happens in the main loop after the flag is observed.
pub fn install(flag: &ShutdownFlag) -> io::Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag.0))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&flag.0))?;
    Ok(())
}
