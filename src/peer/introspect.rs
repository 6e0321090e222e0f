//! OS process introspection behind a swappable interface

use crate::peer::connection::PeerConnection;
use sysinfo::{Pid, ProcessesToUpdate, System};
use thiserror::Error;

/// Identity of a process: who it runs as and which process it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub uid: u32,
    pub gid: u32,
    pub pid: u32,
}

impl ProcessIdentity {
    /// Identity of the running process
    pub fn current() -> Self {
        // SAFETY: getuid/getgid cannot fail and touch no memory
        let (uid, gid) = unsafe { (libc::getuid(), libc::getgid()) };
        Self {
            uid,
            gid,
            pid: std::process::id(),
        }
    }
}

/// Why an introspection step could not produce an answer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntrospectionError {
    #[error("connection is not a local socket")]
    NotLocal,

    #[error("peer credentials unavailable: {0}")]
    Credentials(String),

    #[error("peer process id not reported")]
    NoPid,

    #[error("cannot resolve parent of pid {pid}: {reason}")]
    Parent { pid: u32, reason: String },
}

/// Peer-credential and process-tree lookups
pub trait PeerIntrospector: Send + Sync {
    /// Identity of the process on the other end of `conn`
    fn peer_identity(&self, conn: &PeerConnection) -> Result<ProcessIdentity, IntrospectionError>;

    /// Parent process of `pid`
    fn parent_pid(&self, pid: u32) -> Result<u32, IntrospectionError>;
}

/// Introspection backed by the running kernel
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemIntrospector;

impl PeerIntrospector for SystemIntrospector {
    fn peer_identity(&self, conn: &PeerConnection) -> Result<ProcessIdentity, IntrospectionError> {
        let PeerConnection::Unix { credentials } = conn else {
            return Err(IntrospectionError::NotLocal);
        };
        let creds = credentials
            .as_ref()
            .map_err(|e| IntrospectionError::Credentials(e.clone()))?;
        let pid = creds.pid.ok_or(IntrospectionError::NoPid)?;

        Ok(ProcessIdentity {
            uid: creds.uid,
            gid: creds.gid,
            pid,
        })
    }

    fn parent_pid(&self, pid: u32) -> Result<u32, IntrospectionError> {
        parent_pid(pid)
    }
}

/// Parent of `pid` from the OS process table
fn parent_pid(pid: u32) -> Result<u32, IntrospectionError> {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);

    let process = system.process(target).ok_or_else(|| IntrospectionError::Parent {
        pid,
        reason: "process not found".to_string(),
    })?;
    process
        .parent()
        .map(|parent| parent.as_u32())
        .ok_or_else(|| IntrospectionError::Parent {
            pid,
            reason: "process has no parent".to_string(),
        })
}
