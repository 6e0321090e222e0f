//! Admission check for the credential socket
//!
//! A peer is admitted only when it is a local socket peer running as the
//! daemon's own user and group, and its grandparent process is the daemon.
//! The expected chain is daemon -> build engine -> credential helper.

use crate::peer::connection::PeerConnection;
use crate::peer::introspect::{PeerIntrospector, ProcessIdentity, SystemIntrospector};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Parent links between the connecting process and the daemon
pub const ANCESTRY_DEPTH: usize = 2;

/// Which admission check failed. Internal only: callers see one status.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    #[error("connection is not a local socket")]
    NotLocal,

    #[error("peer identity could not be determined")]
    NoIdentity,

    #[error("peer uid differs from daemon uid")]
    UidMismatch,

    #[error("peer gid differs from daemon gid")]
    GidMismatch,

    #[error("peer ancestry could not be resolved")]
    AncestryUnresolved,

    #[error("peer is not a grandchild of the daemon")]
    AncestryMismatch,
}

impl GuardRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotLocal => "not_local",
            Self::NoIdentity => "no_identity",
            Self::UidMismatch => "uid_mismatch",
            Self::GidMismatch => "gid_mismatch",
            Self::AncestryUnresolved => "ancestry_unresolved",
            Self::AncestryMismatch => "ancestry_mismatch",
        }
    }
}

/// Peer authentication guard
#[derive(Clone)]
pub struct PeerGuard {
    introspector: Arc<dyn PeerIntrospector>,
    daemon: ProcessIdentity,
}

impl PeerGuard {
    /// Create a guard that trusts descendants of `daemon`
    pub fn new(introspector: Arc<dyn PeerIntrospector>, daemon: ProcessIdentity) -> Self {
        Self {
            introspector,
            daemon,
        }
    }

    /// Guard for the running process using kernel introspection
    pub fn system() -> Self {
        Self::new(Arc::new(SystemIntrospector), ProcessIdentity::current())
    }

    pub fn daemon(&self) -> ProcessIdentity {
        self.daemon
    }

    /// Decide whether `conn` may talk to the credential endpoint
    pub fn admit(&self, conn: &PeerConnection) -> Result<ProcessIdentity, GuardRejection> {
        if !conn.is_local() {
            return Err(GuardRejection::NotLocal);
        }

        let peer = self.introspector.peer_identity(conn).map_err(|e| {
            debug!("Peer identity lookup failed: {}", e);
            GuardRejection::NoIdentity
        })?;

        if peer.uid != self.daemon.uid {
            return Err(GuardRejection::UidMismatch);
        }
        if peer.gid != self.daemon.gid {
            return Err(GuardRejection::GidMismatch);
        }

        let mut ancestor = peer.pid;
        for _ in 0..ANCESTRY_DEPTH {
            ancestor = self.introspector.parent_pid(ancestor).map_err(|e| {
                debug!("Ancestry walk from pid {} failed: {}", peer.pid, e);
                GuardRejection::AncestryUnresolved
            })?;
        }

        if ancestor != self.daemon.pid {
            debug!(
                "Peer pid {} has ancestor {} at depth {}, expected {}",
                peer.pid, ancestor, ANCESTRY_DEPTH, self.daemon.pid
            );
            return Err(GuardRejection::AncestryMismatch);
        }

        Ok(peer)
    }
}
