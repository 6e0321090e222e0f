//! Connection metadata captured when a peer is accepted

use std::net::SocketAddr;
use tokio::net::unix::UCred;
use tokio::net::UnixStream;

/// Raw peer credentials as reported by the kernel.
///
/// The PID is optional because not every platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCredentials {
    pub uid: u32,
    pub gid: u32,
    pub pid: Option<u32>,
}

impl From<UCred> for PeerCredentials {
    fn from(cred: UCred) -> Self {
        Self {
            uid: cred.uid(),
            gid: cred.gid(),
            pid: cred.pid().and_then(|pid| u32::try_from(pid).ok()),
        }
    }
}

/// The transport a request arrived on
#[derive(Debug, Clone)]
pub enum PeerConnection {
    /// Unix-domain stream socket
    Unix {
        /// `SO_PEERCRED` lookup result, or the lookup error
        credentials: Result<PeerCredentials, String>,
    },
    /// Anything reachable over the network
    Network { remote: SocketAddr },
}

impl PeerConnection {
    /// Capture the peer of an accepted Unix stream
    pub fn from_unix_stream(stream: &UnixStream) -> Self {
        Self::Unix {
            credentials: stream
                .peer_cred()
                .map(PeerCredentials::from)
                .map_err(|e| e.to_string()),
        }
    }

    /// Unix peer with known credentials
    pub fn unix(credentials: PeerCredentials) -> Self {
        Self::Unix {
            credentials: Ok(credentials),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Self::Unix { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_own_credentials_over_socketpair() {
        let (client, _server) = UnixStream::pair().unwrap();
        let conn = PeerConnection::from_unix_stream(&client);

        assert!(conn.is_local());
        match conn {
            PeerConnection::Unix { credentials } => {
                let creds = credentials.unwrap();
                assert_eq!(creds.uid, unsafe { libc::getuid() });
            }
            PeerConnection::Network { .. } => panic!("expected unix peer"),
        }
    }

    #[test]
    fn network_is_not_local() {
        let conn = PeerConnection::Network {
            remote: "127.0.0.1:8080".parse().unwrap(),
        };
        assert!(!conn.is_local());
    }
}
