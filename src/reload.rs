//! Collector Reload Notification
//!
//! After a new scrape configuration is persisted the collector is asked to
//! reload it. A failed reload never rolls back the file: the on-disk state is
//! already correct and takes effect on the collector's next reload or restart.

use crate::config::{ReloadConfig, ReloadMethod};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

#[async_trait]
pub trait ReloadNotifier: Send + Sync {
    /// Human-readable target, used in logs
    fn target(&self) -> String;

    async fn notify(&self) -> Result<()>;
}

/// Build the notifier selected by `reload.method`
pub fn from_config(config: &ReloadConfig) -> Result<Box<dyn ReloadNotifier>> {
    match config.method {
        ReloadMethod::Http => Ok(Box::new(HttpReloadNotifier::new(
            &config.url,
            config.timeout(),
        )?)),
        ReloadMethod::Command => Ok(Box::new(CommandReloadNotifier::new(
            config.command.clone(),
            config.timeout(),
        )?)),
    }
}

/// `POST <url>` against the collector's lifecycle endpoint (`/-/reload`)
pub struct HttpReloadNotifier {
    url: String,
    http: reqwest::Client,
}

impl HttpReloadNotifier {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.to_string(),
            http,
        })
    }
}

#[async_trait]
impl ReloadNotifier for HttpReloadNotifier {
    fn target(&self) -> String {
        self.url.clone()
    }

    async fn notify(&self) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .map_err(|e| SyncError::Reload(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Reload(format!(
                "{} returned HTTP {}: {}",
                self.url,
                status.as_u16(),
                body.trim()
            )));
        }

        info!("Collector reload accepted by {}", self.url);
        Ok(())
    }
}

/// Runs an external command, e.g. `["systemctl", "reload", "prometheus"]`
pub struct CommandReloadNotifier {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandReloadNotifier {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self> {
        if argv.is_empty() {
            return Err(SyncError::Config(
                "reload command must not be empty".to_string(),
            ));
        }
        Ok(Self { argv, timeout })
    }
}

#[async_trait]
impl ReloadNotifier for CommandReloadNotifier {
    fn target(&self) -> String {
        self.argv.join(" ")
    }

    async fn notify(&self) -> Result<()> {
        let mut command = Command::new(&self.argv[0]);
        command
            .args(&self.argv[1..])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                SyncError::Reload(format!(
                    "`{}` timed out after {:?}",
                    self.target(),
                    self.timeout
                ))
            })?
            .map_err(|e| SyncError::Reload(format!("`{}`: {}", self.target(), e)))?;

        if !output.status.success() {
            return Err(SyncError::Reload(format!(
                "`{}` exited with {}: {}",
                self.target(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!("Collector reload command `{}` succeeded", self.target());
        Ok(())
    }
}
