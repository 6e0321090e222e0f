//! Peer authentication for the credential socket

pub mod connection;
pub mod guard;
pub mod introspect;

pub use connection::{PeerConnection, PeerCredentials};
pub use guard::{GuardRejection, PeerGuard, ANCESTRY_DEPTH};
pub use introspect::{IntrospectionError, PeerIntrospector, ProcessIdentity, SystemIntrospector};
