//! Credential service: the only writer of the credential cache

use crate::credentials::cache::CredentialCache;
use crate::credentials::matching::{self, MatchKind};
use crate::credentials::record::{CredentialEntry, CredentialRecord};
use crate::credentials::BuildId;
use crate::error::{FinchError, FinchResult};
use std::sync::Arc;
use tracing::debug;

/// Stores, resolves and removes per-build registry credentials
#[derive(Debug, Clone)]
pub struct CredentialService {
    cache: Arc<CredentialCache>,
}

impl CredentialService {
    /// Create a service over a shared cache
    pub fn new(cache: Arc<CredentialCache>) -> Self {
        Self { cache }
    }

    /// Create a service with its own empty cache
    pub fn in_memory() -> Self {
        Self::new(Arc::new(CredentialCache::new()))
    }

    /// Generate a new build identifier
    pub fn generate_build_id(&self) -> FinchResult<BuildId> {
        BuildId::generate()
    }

    /// Store the credentials supplied for a build, replacing any earlier set
    pub fn store_auth_configs(&self, build_id: &BuildId, auths: CredentialEntry) -> FinchResult<()> {
        let count = auths.len();
        if self.cache.insert(build_id.clone(), auths).is_some() {
            debug!("Replaced credentials for build {}", build_id);
        }
        debug!("Stored {} registry credential(s) for build {}", count, build_id);
        Ok(())
    }

    /// Resolve the credential a build declared for `address`
    pub fn get_credentials(&self, build_id: &BuildId, address: &str) -> FinchResult<CredentialRecord> {
        self.resolve(build_id, address).map(|(record, _)| record)
    }

    /// Resolve a credential and report which matching pass found it
    pub fn resolve(
        &self,
        build_id: &BuildId,
        address: &str,
    ) -> FinchResult<(CredentialRecord, MatchKind)> {
        let resolved = self.cache.with_entry(build_id, |entry| {
            matching::resolve(entry, address).map(|(key, kind)| (entry[key].clone(), kind))
        });

        match resolved {
            None => Err(FinchError::BuildNotFound {
                build_ref: build_id.fingerprint(),
            }),
            Some(None) => {
                debug!("No credential matches {} for build {}", address, build_id);
                Err(FinchError::CredentialNotFound {
                    build_ref: build_id.fingerprint(),
                    address: address.to_string(),
                })
            }
            Some(Some((record, kind))) => {
                debug!(
                    "Resolved {} for build {} ({} match)",
                    address,
                    build_id,
                    kind.as_str()
                );
                Ok((record, kind))
            }
        }
    }

    /// Remove a build's credentials
    pub fn remove_credentials(&self, build_id: &BuildId) -> FinchResult<()> {
        match self.cache.remove(build_id) {
            Some(_) => {
                debug!("Removed credentials for build {}", build_id);
                Ok(())
            }
            None => Err(FinchError::BuildNotFound {
                build_ref: build_id.fingerprint(),
            }),
        }
    }

    /// Number of builds currently holding credentials
    pub fn active_builds(&self) -> usize {
        self.cache.len()
    }
}
