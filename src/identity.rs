// System identity lookup for the configured daemon user

use nix::unistd::{Gid, Uid, User};
use std::path::PathBuf;
use thiserror::Error;

/// The account the daemon runs as once privileges are dropped.
/// Resolved once at startup and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Identity {
    pub name: String,
    pub uid: Uid,
    pub gid: Gid,
    pub home: PathBuf,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// No such account in the user database. Fatal: running as whoever
    /// happens to hold the current ids instead is not an option.
    #[error("unknown user '{0}'")]
    UnknownUser(String),

    /// The lookup itself failed (nsswitch backend error etc).
    #[error("user database lookup for '{name}' failed: {source}")]
    Lookup {
        name: String,
        #[source]
        source: nix::Error,
    },
}

/// Resolve `name` against the system user database.
pub fn resolve(name: &str) -> Result<Identity, IdentityError> {
    let user = User::from_name(name)
        .map_err(|source| IdentityError::Lookup {
            name: name.to_string(),
            source,
        })?
        .ok_or_else(|| IdentityError::UnknownUser(name.to_string()))?;

    Ok(Identity {
        name: user.name,
        uid: user.uid,
        gid: user.gid,
        home: user.dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::geteuid;

    #[test]
    fn resolves_the_current_user() {
        let me = User::from_uid(geteuid()).unwrap().unwrap();

        let identity = resolve(&me.name).unwrap();

        assert_eq!(identity.uid, me.uid);
        assert_eq!(identity.gid, me.gid);
        assert_eq!(identity.home, me.dir);
    }

    #[test]
    fn unknown_account_is_an_error() {
        match resolve("macrokeyd-no-such-user") {
            Err(IdentityError::UnknownUser(name)) => {
                assert_eq!(name, "macrokeyd-no-such-user");
            }
            other => panic!("expected UnknownUser, got {other:?}"),
        }
    }
}
