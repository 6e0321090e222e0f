//! Audit logging for credential events
//!
//! Writes JSON lines to `<state_dir>/finchcred/audit.log`. Entries name
//! builds by fingerprint and registries by address; secrets never appear.

use crate::config::{schema::Config, ConfigManager};
use chrono::Utc;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// File-based audit logger that appends JSON lines
#[derive(Debug, Clone)]
pub struct AuditLog {
    enabled: bool,
    path: PathBuf,
}

impl AuditLog {
    /// Create a new audit logger from config
    pub fn new(config: &Config) -> Self {
        Self {
            enabled: config.general.audit_log,
            path: ConfigManager::audit_log_path(),
        }
    }

    /// Create an audit logger writing to a specific file
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            enabled: true,
            path,
        }
    }

    /// An audit logger that records nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            path: PathBuf::new(),
        }
    }

    /// Log an audit event as a JSON line
    ///
    /// IO failures are reported through tracing and otherwise dropped.
    pub async fn log(&self, event: &str, data: &serde_json::Value) {
        if !self.enabled {
            return;
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "event": event,
            "data": data,
        });

        let mut line = match serde_json::to_string(&entry) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = self.append(&line).await {
            warn!("Failed to write audit log: {}", e);
        }
    }

    /// Log from a synchronous context (e.g. `Drop`) on the current runtime
    pub fn log_detached(&self, event: &'static str, data: serde_json::Value) {
        if !self.enabled {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let audit = self.clone();
                handle.spawn(async move { audit.log(event, &data).await });
            }
            Err(_) => warn!("No runtime available, dropping audit event {}", event),
        }
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
