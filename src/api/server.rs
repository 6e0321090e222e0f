//! Unix-socket listener for the credential endpoint
//!
//! Each accepted connection has its peer credentials captured before any
//! bytes are read, then is served on its own task with a bounded header read.

use crate::config::schema::CredentialSocketConfig;
use crate::error::{FinchError, FinchResult};
use crate::peer::PeerConnection;
use axum::extract::ConnectInfo;
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixListener;
use tower::Service;
use tracing::{debug, info, warn};

/// Pause before accepting again after an accept error such as EMFILE
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Listener bound to the dedicated credential socket
pub struct CredentialServer {
    listener: UnixListener,
    path: PathBuf,
    router: Router,
    header_read_timeout: Duration,
}

impl CredentialServer {
    /// Bind the credential socket, replacing any stale socket file
    pub async fn bind(config: &CredentialSocketConfig, router: Router) -> FinchResult<Self> {
        let path = config.socket_path.clone();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                FinchError::io(format!("creating socket directory {}", parent.display()), e)
            })?;
        }

        remove_socket_file(&path).await?;

        let listener = UnixListener::bind(&path)
            .map_err(|e| FinchError::io(format!("binding {}", path.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(config.socket_mode);
            std::fs::set_permissions(&path, perms)
                .map_err(|e| FinchError::io("setting credential socket permissions", e))?;
        }

        info!("Credential socket listening on {}", path.display());

        Ok(Self {
            listener,
            path,
            router,
            header_read_timeout: Duration::from_secs(config.header_read_timeout_secs),
        })
    }

    /// Path of the bound socket
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serve until `shutdown` resolves, then remove the socket file.
    ///
    /// Connections already accepted finish on their own tasks.
    pub async fn serve_with_shutdown<F>(self, shutdown: F) -> FinchResult<()>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            let stream = tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => stream,
                    Err(e) => {
                        warn!("Failed to accept credential socket connection: {}", e);
                        if pause_or_shutdown(&mut shutdown).await {
                            break;
                        }
                        continue;
                    }
                },
                _ = &mut shutdown => break,
            };

            let peer = PeerConnection::from_unix_stream(&stream);
            let router = self.router.clone();
            let header_read_timeout = self.header_read_timeout;

            tokio::spawn(async move {
                let service = hyper::service::service_fn(move |mut request: hyper::Request<Incoming>| {
                    request.extensions_mut().insert(ConnectInfo(peer.clone()));
                    router.clone().call(request)
                });

                let mut builder = http1::Builder::new();
                builder
                    .timer(TokioTimer::new())
                    .header_read_timeout(header_read_timeout);

                if let Err(e) = builder
                    .serve_connection(TokioIo::new(stream), service)
                    .await
                {
                    debug!("Credential socket connection ended: {}", e);
                }
            });
        }

        info!("Credential socket shutting down");
        remove_socket_file(&self.path).await
    }
}

/// Sleep after a failed accept; `true` if shutdown arrived meanwhile
async fn pause_or_shutdown<F>(shutdown: &mut F) -> bool
where
    F: Future<Output = ()> + Unpin,
{
    tokio::select! {
        _ = tokio::time::sleep(ACCEPT_ERROR_BACKOFF) => false,
        _ = shutdown => true,
    }
}

async fn remove_socket_file(path: &Path) -> FinchResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed socket file {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(FinchError::io(
            format!("removing socket file {}", path.display()),
            e,
        )),
    }
}
