//! Build orchestration
//!
//! Registry auth supplied with a build is decoded, stored under a fresh
//! build ID for exactly the lifetime of the engine invocation, and removed
//! on every exit path.

mod engine;
mod scope;

pub use engine::{BuildEngine, BuildInvocation, CommandEngine};
pub use scope::BuildAuthScope;

use crate::audit::AuditLog;
use crate::credentials::{
    decode_registry_config, parse_registry_config, CredentialEntry, CredentialService,
};
use crate::error::{FinchError, FinchResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry auth as it arrives with a build request
#[derive(Debug, Clone)]
pub enum RegistryAuth {
    /// Base64 `X-Registry-Config` header value
    Header(String),

    /// Plain JSON map of server address to auth config
    Json(Vec<u8>),
}

impl RegistryAuth {
    pub fn decode(&self) -> FinchResult<CredentialEntry> {
        match self {
            Self::Header(value) => decode_registry_config(value),
            Self::Json(raw) => parse_registry_config(raw),
        }
    }
}

/// What to build
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub context: PathBuf,
    pub args: Vec<String>,
}

/// Runs builds with credentials scoped to each invocation
pub struct BuildOrchestrator {
    service: CredentialService,
    engine: Arc<dyn BuildEngine>,
    audit: AuditLog,
    credential_socket: PathBuf,
}

impl BuildOrchestrator {
    pub fn new(
        service: CredentialService,
        engine: Arc<dyn BuildEngine>,
        audit: AuditLog,
        credential_socket: PathBuf,
    ) -> Self {
        Self {
            service,
            engine,
            audit,
            credential_socket,
        }
    }

    /// Run one build; fails with `BuildFailed` when the engine exits non-zero
    pub async fn run(
        &self,
        registry_auth: Option<&RegistryAuth>,
        request: BuildRequest,
    ) -> FinchResult<()> {
        let auths = match registry_auth {
            Some(auth) => auth.decode()?,
            None => CredentialEntry::new(),
        };

        let scope = if auths.is_empty() {
            debug!("No registry auth supplied, building without credentials");
            None
        } else {
            Some(BuildAuthScope::acquire(&self.service, &self.audit, auths).await?)
        };

        let invocation = BuildInvocation {
            context: request.context,
            args: request.args,
            build_id: scope.as_ref().map(|s| s.build_id().clone()),
            credential_socket: self.credential_socket.clone(),
        };

        info!("Starting build with {}", self.engine.engine_name());
        let code = self.engine.build(&invocation).await?;
        drop(scope);

        if code != 0 {
            return Err(FinchError::BuildFailed { code });
        }

        info!("Build finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use std::sync::Mutex;

    /// Engine that checks what it can see while the build runs
    struct RecordingEngine {
        service: CredentialService,
        outcome: fn() -> FinchResult<i32>,
        seen: Mutex<Vec<(Option<String>, bool)>>,
    }

    impl RecordingEngine {
        fn new(service: &CredentialService, outcome: fn() -> FinchResult<i32>) -> Arc<Self> {
            Arc::new(Self {
                service: service.clone(),
                outcome,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl BuildEngine for RecordingEngine {
        async fn build(&self, invocation: &BuildInvocation) -> FinchResult<i32> {
            let resolvable = invocation
                .build_id
                .as_ref()
                .map(|id| self.service.get_credentials(id, "https://ghcr.io").is_ok())
                .unwrap_or(false);
            self.seen.lock().unwrap().push((
                invocation.build_id.as_ref().map(|id| id.as_str().to_string()),
                resolvable,
            ));
            (self.outcome)()
        }

        fn engine_name(&self) -> &str {
            "recording"
        }
    }

    fn header() -> RegistryAuth {
        RegistryAuth::Header(
            STANDARD.encode(r#"{"https://ghcr.io":{"username":"alice","password":"pw"}}"#),
        )
    }

    fn request() -> BuildRequest {
        BuildRequest {
            context: PathBuf::from("."),
            args: vec![],
        }
    }

    fn orchestrator(service: &CredentialService, engine: Arc<RecordingEngine>) -> BuildOrchestrator {
        BuildOrchestrator::new(
            service.clone(),
            engine,
            AuditLog::disabled(),
            PathBuf::from("/run/cred.sock"),
        )
    }

    #[tokio::test]
    async fn credentials_visible_during_build_and_removed_after() {
        let service = CredentialService::in_memory();
        let engine = RecordingEngine::new(&service, || Ok(0));

        orchestrator(&service, engine.clone())
            .run(Some(&header()), request())
            .await
            .unwrap();

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].0.is_some());
        assert!(seen[0].1);
        assert_eq!(service.active_builds(), 0);
    }

    #[tokio::test]
    async fn credentials_removed_when_engine_fails() {
        let service = CredentialService::in_memory();
        let engine = RecordingEngine::new(&service, || Err(FinchError::ProcessSignaled));

        let err = orchestrator(&service, engine)
            .run(Some(&header()), request())
            .await
            .unwrap_err();

        assert!(matches!(err, FinchError::ProcessSignaled));
        assert_eq!(service.active_builds(), 0);
    }

    #[tokio::test]
    async fn nonzero_exit_is_build_failure() {
        let service = CredentialService::in_memory();
        let engine = RecordingEngine::new(&service, || Ok(2));

        let err = orchestrator(&service, engine)
            .run(Some(&header()), request())
            .await
            .unwrap_err();

        assert!(matches!(err, FinchError::BuildFailed { code: 2 }));
        assert_eq!(service.active_builds(), 0);
    }

    #[tokio::test]
    async fn no_auth_skips_credentials_entirely() {
        let service = CredentialService::in_memory();
        let engine = RecordingEngine::new(&service, || Ok(0));
        let orchestrator = orchestrator(&service, engine.clone());

        orchestrator.run(None, request()).await.unwrap();
        orchestrator
            .run(Some(&RegistryAuth::Json(b"{}".to_vec())), request())
            .await
            .unwrap();

        let seen = engine.seen.lock().unwrap();
        assert!(seen.iter().all(|(id, _)| id.is_none()));
    }

    #[tokio::test]
    async fn malformed_auth_never_reaches_engine() {
        let service = CredentialService::in_memory();
        let engine = RecordingEngine::new(&service, || Ok(0));

        let err = orchestrator(&service, engine.clone())
            .run(Some(&RegistryAuth::Header("%%%".into())), request())
            .await
            .unwrap_err();

        assert!(matches!(err, FinchError::RegistryConfig(_)));
        assert!(engine.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn each_build_gets_a_fresh_id() {
        let service = CredentialService::in_memory();
        let engine = RecordingEngine::new(&service, || Ok(0));
        let orchestrator = orchestrator(&service, engine.clone());

        orchestrator.run(Some(&header()), request()).await.unwrap();
        orchestrator.run(Some(&header()), request()).await.unwrap();

        let seen = engine.seen.lock().unwrap();
        assert_ne!(seen[0].0, seen[1].0);
    }
}
