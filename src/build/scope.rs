//! Scoped lifetime of a build's registry credentials

use crate::audit::AuditLog;
use crate::credentials::{BuildId, CredentialEntry, CredentialService};
use crate::error::FinchResult;
use serde_json::json;
use tracing::{debug, warn};

/// Holds a build's credentials in the cache; dropping it removes them
#[derive(Debug)]
pub struct BuildAuthScope {
    service: CredentialService,
    audit: AuditLog,
    build_id: BuildId,
}

impl BuildAuthScope {
    /// Generate a build ID and store `auths` under it
    pub async fn acquire(
        service: &CredentialService,
        audit: &AuditLog,
        auths: CredentialEntry,
    ) -> FinchResult<Self> {
        let build_id = service.generate_build_id()?;

        let mut registries: Vec<String> = auths.keys().cloned().collect();
        registries.sort();

        let scope = Self {
            service: service.clone(),
            audit: audit.clone(),
            build_id,
        };
        scope.service.store_auth_configs(&scope.build_id, auths)?;

        audit
            .log(
                "credentials.stored",
                &json!({
                    "build_ref": scope.build_id.fingerprint(),
                    "registries": registries,
                }),
            )
            .await;

        Ok(scope)
    }

    pub fn build_id(&self) -> &BuildId {
        &self.build_id
    }
}

impl Drop for BuildAuthScope {
    fn drop(&mut self) {
        match self.service.remove_credentials(&self.build_id) {
            Ok(()) => self.audit.log_detached(
                "credentials.removed",
                json!({ "build_ref": self.build_id.fingerprint() }),
            ),
            Err(e) if e.is_not_found() => {
                debug!("Credentials for build {} already removed", self.build_id)
            }
            Err(e) => warn!("Failed to remove credentials for build {}: {}", self.build_id, e),
        }
    }
}
