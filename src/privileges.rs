// Privilege de-escalation to the configured unprivileged identity
//
// Ordering is load-bearing: the effective group id must change before
// the effective user id, because the right to change groups is itself
// lost once the uid drops.

use crate::identity::Identity;
use nix::unistd::{setegid, seteuid, Gid, Uid};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PrivilegeError {
    #[error("failed to set effective group id to {gid}: {source}")]
    SetGid {
        gid: Gid,
        #[source]
        source: nix::Error,
    },

    #[error("failed to set effective user id to {uid}: {source}")]
    SetUid {
        uid: Uid,
        #[source]
        source: nix::Error,
    },
}

/// Seam over the two effective-id syscalls so the drop ordering can be
/// exercised with a recording double.
trait PrivilegeOps {
    fn set_effective_gid(&mut self, gid: Gid) -> nix::Result<()>;
    fn set_effective_uid(&mut self, uid: Uid) -> nix::Result<()>;
}

struct SystemOps;

impl PrivilegeOps for SystemOps {
    fn set_effective_gid(&mut self, gid: Gid) -> nix::Result<()> {
        setegid(gid)
    }

    fn set_effective_uid(&mut self, uid: Uid) -> nix::Result<()> {
        seteuid(uid)
    }
}

/// Drop the process's effective group and user ids to `identity`.
///
/// Either failure is fatal to the caller: the daemon must never keep
/// running at a privilege level it was not configured for.
pub fn drop_to(identity: &Identity) -> Result<(), PrivilegeError> {
    drop_with(&mut SystemOps, identity)?;
    debug!(
        user = %identity.name,
        uid = %identity.uid,
        gid = %identity.gid,
        "privileges dropped"
    );
    Ok(())
}

fn drop_with(ops: &mut impl PrivilegeOps, identity: &Identity) -> Result<(), PrivilegeError> {
    // Group first; see module comment.
    ops.set_effective_gid(identity.gid)
        .map_err(|source| PrivilegeError::SetGid {
            gid: identity.gid,
            source,
        })?;
    ops.set_effective_uid(identity.uid)
        .map_err(|source| PrivilegeError::SetUid {
            uid: identity.uid,
            source,
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{getegid, geteuid};
    use std::path::PathBuf;

    fn identity() -> Identity {
        Identity {
            name: "games".to_string(),
            uid: Uid::from_raw(5),
            gid: Gid::from_raw(60),
            home: PathBuf::from("/usr/games"),
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        fail_gid: bool,
    }

    impl PrivilegeOps for Recorder {
        fn set_effective_gid(&mut self, _gid: Gid) -> nix::Result<()> {
            self.calls.push("gid");
            if self.fail_gid {
                return Err(nix::Error::EPERM);
            }
            Ok(())
        }

        fn set_effective_uid(&mut self, _uid: Uid) -> nix::Result<()> {
            self.calls.push("uid");
            Ok(())
        }
    }

    #[test]
    fn group_id_is_set_before_user_id() {
        let mut ops = Recorder::default();
        drop_with(&mut ops, &identity()).unwrap();
        assert_eq!(ops.calls, ["gid", "uid"]);
    }

    #[test]
    fn gid_failure_stops_before_the_uid_step() {
        let mut ops = Recorder {
            fail_gid: true,
            ..Recorder::default()
        };

        match drop_with(&mut ops, &identity()) {
            Err(PrivilegeError::SetGid { gid, .. }) => {
                assert_eq!(gid, Gid::from_raw(60));
            }
            other => panic!("expected SetGid error, got {other:?}"),
        }
        assert_eq!(ops.calls, ["gid"]);
    }

    #[test]
    fn dropping_to_the_current_identity_is_a_no_op() {
        // Re-setting our own effective ids needs no privilege, so the
        // real syscall path is exercisable in an unprivileged test.
        let current = Identity {
            name: "current".to_string(),
            uid: geteuid(),
            gid: getegid(),
            home: PathBuf::from("/"),
        };
        drop_to(&current).unwrap();
    }
}
