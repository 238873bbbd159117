// macrokeyd - Linux Macro Keyboard Daemon - Process Lifecycle Core
// Single-instance locking, privilege drop, and the supervised listen loop

pub mod config;
pub mod daemon;
pub mod identity;
pub mod listener;
pub mod pidfile;
pub mod privileges;
pub mod shutdown;
pub mod workdir;

pub use config::Config;
pub use daemon::{Daemon, FatalError, State};
pub use identity::{Identity, IdentityError};
pub use listener::{IdleListener, Listener};
pub use pidfile::{LockError, PidFile};
pub use privileges::PrivilegeError;
pub use shutdown::ShutdownFlag;
pub use workdir::WorkspaceError;
