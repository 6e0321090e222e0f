//! Build command - run one build with isolated registry credentials

use crate::api::{self, AppState, CredentialServer};
use crate::audit::AuditLog;
use crate::build::{BuildOrchestrator, BuildRequest, CommandEngine, RegistryAuth};
use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::credentials::CredentialService;
use crate::error::{FinchError, FinchResult};
use crate::peer::PeerGuard;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> FinchResult<()> {
    let registry_auth = load_registry_auth(&args).await?;

    let mut socket_config = config.credential.clone();
    if let Some(socket) = args.socket {
        socket_config.socket_path = socket;
    }

    let mut build_config = config.build.clone();
    if let Some(engine) = args.engine {
        build_config.engine = engine;
    }

    let service = CredentialService::in_memory();
    let audit = AuditLog::new(config);
    let guard = PeerGuard::system();
    debug!("Credential guard expects daemon {:?}", guard.daemon());

    let router = api::router(AppState::new(service.clone(), guard, audit.clone()));
    let server = CredentialServer::bind(&socket_config, router).await?;
    let socket_path = server.path().to_path_buf();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(server.serve_with_shutdown(async move {
        let _ = shutdown_rx.await;
    }));

    let orchestrator = BuildOrchestrator::new(
        service,
        Arc::new(CommandEngine::from_config(&build_config)),
        audit,
        socket_path,
    );
    let request = BuildRequest {
        context: args.context,
        args: args.engine_args,
    };

    let result = tokio::select! {
        result = orchestrator.run(registry_auth.as_ref(), request) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, cancelling build");
            Err(FinchError::User("Build interrupted".to_string()))
        }
    };

    let _ = shutdown_tx.send(());
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Credential socket shutdown failed: {}", e),
        Err(e) => warn!("Credential socket task failed: {}", e),
    }

    result
}

async fn load_registry_auth(args: &BuildArgs) -> FinchResult<Option<RegistryAuth>> {
    if let Some(header) = &args.registry_config_header {
        return Ok(Some(RegistryAuth::Header(header.clone())));
    }

    match &args.registry_config {
        Some(path) => {
            let raw = tokio::fs::read(path).await.map_err(|e| {
                FinchError::io(format!("reading registry config {}", path.display()), e)
            })?;
            Ok(Some(RegistryAuth::Json(raw)))
        }
        None => Ok(None),
    }
}
