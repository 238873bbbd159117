// Daemon orchestrator - startup protocol, supervised loop, teardown
//
// Startup is a strict forward sequence; every fatal check happens before
// the loop is entered, and once the loop runs only the shutdown flag can
// end it.

use crate::config::Config;
use crate::identity::{self, Identity, IdentityError};
use crate::listener::Listener;
use crate::pidfile::{LockError, PidFile};
use crate::privileges::{self, PrivilegeError};
use crate::shutdown::{self, ShutdownFlag};
use crate::workdir;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Lifecycle states, in the only order they may be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    Init,
    SignalsInstalled,
    ConfigLoaded,
    LockAcquired,
    IdentityResolved,
    PrivilegesDropped,
    WorkspaceReady,
    Running,
    ShuttingDown,
    Terminated,
}

/// Conditions that abort startup. All of them are detected before the
/// listener loop is entered; the process must exit non-zero on any.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] io::Error),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Privileges(#[from] PrivilegeError),
}

/// The process-lifecycle orchestrator.
///
/// Owns the shutdown flag and sequences signal installation, config
/// loading, instance locking, identity resolution, privilege drop, and
/// workspace setup before handing control to the listener loop.
#[derive(Debug)]
pub struct Daemon {
    config_path: PathBuf,
    workdir_override: Option<PathBuf>,
    shutdown: ShutdownFlag,
    state: State,
}

impl Daemon {
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            workdir_override: None,
            shutdown: ShutdownFlag::new(),
            state: State::Init,
        }
    }

    /// Use `dir` as the working directory instead of the default under
    /// the daemon user's home.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir_override = Some(dir.into());
        self
    }

    /// A handle to the daemon's shutdown flag. Setting it has the same
    /// effect as a termination signal.
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Run the full lifecycle: startup protocol, listener loop until the
    /// shutdown flag is set, then teardown.
    ///
    /// `make_listener` is called once, after the workspace step, with the
    /// loaded config and resolved identity.
    pub fn run<L, F>(mut self, make_listener: F) -> Result<(), FatalError>
    where
        L: Listener,
        F: FnOnce(&Config, &Identity) -> L,
    {
        info!(version = env!("CARGO_PKG_VERSION"), "starting macrokeyd");

        shutdown::install(&self.shutdown).map_err(FatalError::Signals)?;
        self.advance(State::SignalsInstalled);

        let config = Config::load(&self.config_path);
        self.advance(State::ConfigLoaded);

        let lock = PidFile::acquire(&config.pid_file)?;
        self.advance(State::LockAcquired);

        // From here on the lock is held; any fatal return below releases
        // it on the way out.
        let identity = identity::resolve(&config.user)?;
        self.advance(State::IdentityResolved);

        privileges::drop_to(&identity)?;
        self.advance(State::PrivilegesDropped);

        match workdir::prepare(&identity, self.workdir_override.as_deref()) {
            Ok(path) => debug!(path = %path.display(), "workspace prepared"),
            Err(err) => warn!(error = %err, "workspace unavailable, continuing without it"),
        }
        self.advance(State::WorkspaceReady);

        let mut listener = make_listener(&config, &identity);
        self.advance(State::Running);
        info!(user = %identity.name, profile = config.profile, "entering listen loop");

        while !self.shutdown.is_set() {
            listener.step();
        }

        self.advance(State::ShuttingDown);
        info!("shutdown requested, leaving listen loop");

        lock.release();
        self.advance(State::Terminated);
        info!("shutdown complete");
        Ok(())
    }

    fn advance(&mut self, next: State) {
        debug_assert!(next > self.state, "lifecycle may only move forward");
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }
}

/// Log a fatal startup condition the way the operator should see it.
pub fn report_fatal(err: &FatalError) {
    match err {
        FatalError::Lock(LockError::AlreadyRunning { .. }) => {
            error!(error = %err, "refusing to start a second instance")
        }
        _ => error!(error = %err, "daemon failed to start"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_strictly_ordered() {
        let order = [
            State::Init,
            State::SignalsInstalled,
            State::ConfigLoaded,
            State::LockAcquired,
            State::IdentityResolved,
            State::PrivilegesDropped,
            State::WorkspaceReady,
            State::Running,
            State::ShuttingDown,
            State::Terminated,
        ];
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1], "{:?} must precede {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn advance_moves_forward() {
        let mut daemon = Daemon::new("/tmp/unused.conf");
        assert_eq!(daemon.state, State::Init);

        daemon.advance(State::SignalsInstalled);
        daemon.advance(State::ConfigLoaded);
        assert_eq!(daemon.state, State::ConfigLoaded);
    }

    #[test]
    #[should_panic(expected = "lifecycle may only move forward")]
    fn advance_rejects_going_backwards() {
        let mut daemon = Daemon::new("/tmp/unused.conf");
        daemon.advance(State::Running);
        daemon.advance(State::ConfigLoaded);
    }
}
