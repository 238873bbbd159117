// Private working directory under the daemon user's home

use crate::identity::Identity;
use std::fs::DirBuilder;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};
use std::{env, io};
use thiserror::Error;
use tracing::debug;

/// Directory name created under the daemon user's home.
pub const WORKDIR_NAME: &str = ".macrokeyd";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("could not create working directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not enter working directory {path}: {source}")]
    Enter {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Create the daemon's working directory and make it the process cwd.
///
/// Defaults to `<home>/.macrokeyd`, created owner-only if absent;
/// `override_dir` replaces the computed path entirely. The caller treats
/// failure as non-fatal: the daemon keeps running, just without a valid
/// working-directory assumption.
pub fn prepare(identity: &Identity, override_dir: Option<&Path>) -> Result<PathBuf, WorkspaceError> {
    let path = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => identity.home.join(WORKDIR_NAME),
    };

    if !path.exists() {
        DirBuilder::new()
            .recursive(true)
            .mode(0o700)
            .create(&path)
            .map_err(|source| WorkspaceError::Create {
                path: path.clone(),
                source,
            })?;
    }

    env::set_current_dir(&path).map_err(|source| WorkspaceError::Enter {
        path: path.clone(),
        source,
    })?;

    debug!(path = %path.display(), "working directory ready");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{Gid, Uid};
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // The process cwd is global state; tests that call prepare() take
    // this lock so the cwd assertion below cannot race.
    static CWD: Mutex<()> = Mutex::new(());

    fn identity_with_home(home: &Path) -> Identity {
        Identity {
            name: "games".to_string(),
            uid: Uid::from_raw(5),
            gid: Gid::from_raw(60),
            home: home.to_path_buf(),
        }
    }

    #[test]
    fn creates_owner_only_dir_under_home_and_enters_it() {
        let _cwd = CWD.lock().unwrap_or_else(|e| e.into_inner());
        let home = TempDir::new().unwrap();
        let identity = identity_with_home(home.path());

        let path = prepare(&identity, None).unwrap();

        assert_eq!(path, home.path().join(WORKDIR_NAME));
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
        assert_eq!(
            env::current_dir().unwrap().canonicalize().unwrap(),
            path.canonicalize().unwrap()
        );
    }

    #[test]
    fn explicit_override_replaces_the_computed_path() {
        let _cwd = CWD.lock().unwrap_or_else(|e| e.into_inner());
        let home = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let identity = identity_with_home(home.path());
        let target = elsewhere.path().join("state");

        let path = prepare(&identity, Some(&target)).unwrap();

        assert_eq!(path, target);
        assert!(target.is_dir());
        assert!(!home.path().join(WORKDIR_NAME).exists());
    }

    #[test]
    fn uncreatable_directory_is_reported() {
        let identity = identity_with_home(Path::new("/proc/no-such-home"));
        match prepare(&identity, None) {
            Err(WorkspaceError::Create { .. }) => {}
            other => panic!("expected Create error, got {other:?}"),
        }
    }
}
