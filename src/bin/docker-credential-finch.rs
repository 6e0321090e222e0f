//! docker-credential-finch - credential helper for isolated builds
//!
//! Invoked by the build engine as `docker-credential-finch <action>`.
//! Only `get` returns credentials; stdout is reserved for the protocol,
//! so diagnostics go to stderr.

use finchcred::config::ConfigManager;
use finchcred::helper::{self, FinchHelper, HelperEnv};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FINCH_CREDENTIAL_HELPER_LOG";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let Some(action) = std::env::args().nth(1) else {
        eprintln!("Usage: docker-credential-finch <get|store|erase|list|version>");
        return ExitCode::FAILURE;
    };

    let config_manager = match std::env::var_os("FINCHCRED_CONFIG") {
        Some(path) => ConfigManager::with_path(path.into()),
        None => ConfigManager::new(),
    };
    let config = match config_manager.load().await {
        Ok(config) => config,
        Err(e) => {
            debug!("Using default helper settings: {}", e);
            Default::default()
        }
    };

    let helper = FinchHelper::new(HelperEnv::from_env(), &config.helper);
    let mut stdout = tokio::io::stdout();
    helper::serve(&helper, &action, tokio::io::stdin(), &mut stdout).await
}
