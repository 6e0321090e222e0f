//! Build engine abstraction
//!
//! The engine is an opaque collaborator: it is told where the credential
//! socket lives and, when the build carries registry auth, which build ID
//! to hand to the credential helper.

use crate::config::schema::BuildConfig;
use crate::credentials::BuildId;
use crate::error::{FinchError, FinchResult};
use crate::protocol::{BUILD_ID_ENV, CREDENTIAL_SOCKET_ENV};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// One build to run
#[derive(Debug, Clone)]
pub struct BuildInvocation {
    /// Build context directory
    pub context: PathBuf,

    /// Extra engine arguments, placed before the context
    pub args: Vec<String>,

    /// Present only when the build stored registry credentials
    pub build_id: Option<BuildId>,

    /// Socket the credential helper should dial
    pub credential_socket: PathBuf,
}

/// Something that can execute a build
#[async_trait]
pub trait BuildEngine: Send + Sync {
    /// Run the build to completion and return the engine's exit code
    async fn build(&self, invocation: &BuildInvocation) -> FinchResult<i32>;

    /// Human-readable engine name for logs
    fn engine_name(&self) -> &str;
}

/// Runs an external build tool such as `nerdctl build` or `buildctl`
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    base_args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, base_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            base_args,
        }
    }

    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.engine.clone(), config.engine_args.clone())
    }

    fn command(&self, invocation: &BuildInvocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args)
            .args(&invocation.args)
            .arg(&invocation.context)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match &invocation.build_id {
            Some(build_id) => {
                cmd.env(BUILD_ID_ENV, build_id.as_str())
                    .env(CREDENTIAL_SOCKET_ENV, &invocation.credential_socket);
            }
            None => {
                // never inherit a stale id from our own environment
                cmd.env_remove(BUILD_ID_ENV).env_remove(CREDENTIAL_SOCKET_ENV);
            }
        }

        cmd
    }

    fn describe(&self, invocation: &BuildInvocation) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.base_args.iter().cloned());
        parts.extend(invocation.args.iter().cloned());
        parts.push(invocation.context.display().to_string());
        parts.join(" ")
    }
}

#[async_trait]
impl BuildEngine for CommandEngine {
    async fn build(&self, invocation: &BuildInvocation) -> FinchResult<i32> {
        let description = self.describe(invocation);
        debug!("Executing: {}", description);

        let mut child = self
            .command(invocation)
            .spawn()
            .map_err(|e| FinchError::command_failed(description.clone(), e))?;

        stream_child_output(&mut child, &|line: String| info!("{}", line)).await;

        let status = child
            .wait()
            .await
            .map_err(|e| FinchError::command_failed(description, e))?;

        status.code().ok_or(FinchError::ProcessSignaled)
    }

    fn engine_name(&self) -> &str {
        &self.program
    }
}

/// Forward stdout and stderr lines to `on_output` until both close
async fn stream_child_output(child: &mut Child, on_output: &(dyn Fn(String) + Send + Sync)) {
    let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
    let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            line = next_line(&mut stdout), if stdout.is_some() => match line {
                Some(line) => on_output(line),
                None => stdout = None,
            },
            line = next_line(&mut stderr), if stderr.is_some() => match line {
                Some(line) => on_output(line),
                None => stderr = None,
            },
        }
    }
}

async fn next_line<R>(reader: &mut Option<tokio::io::Lines<R>>) -> Option<String>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    match reader {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => None,
    }
}
