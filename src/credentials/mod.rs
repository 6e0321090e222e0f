//! Per-build registry credentials
//!
//! Credentials supplied with a build request live only in memory, scoped to
//! a [`BuildId`], and are removed when the build ends.

mod build_id;
pub mod cache;
pub mod matching;
pub mod record;
pub mod service;

pub use build_id::BuildId;
pub use cache::CredentialCache;
pub use matching::MatchKind;
pub use record::{decode_registry_config, parse_registry_config, CredentialEntry, CredentialRecord};
pub use service::CredentialService;
