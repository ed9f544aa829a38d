//! Exclusive owner of the routing engine's on-disk configuration.
//!
//! # Data Flow
//! ```text
//! control endpoint (init / receiver CRUD)
//!     → lock → read file → edit in memory → rewrite whole file
//!     → POST /-/reload on the routing engine
//!     → unlock
//! ```
//!
//! # Design Decisions
//! - One process-wide exclusive lock wraps the whole read-modify-write,
//!   including the reload call, so reloads land in write order
//! - Reads take the same exclusive lock; the file is never shared
//! - A write only happens when something actually changed, keeping reload
//!   churn (and the bootstrap idempotence guarantee) intact

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::amconfig::{render_default_config, AmConfig, InitInfo, ReceiverWithRoute, DEFAULT_RECEIVER};
use crate::error::{Error, Result};
use crate::http::RELOAD_PATH;
use crate::observability::metrics;

pub struct ConfigStore {
    path: PathBuf,
    alertmanager_url: String,
    client: reqwest::Client,
    lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(
        path: impl Into<PathBuf>,
        alertmanager_url: impl Into<String>,
        upstream_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(upstream_timeout).build()?;
        Ok(Self {
            path: path.into(),
            alertmanager_url: alertmanager_url.into().trim_end_matches('/').to_string(),
            client,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Poll the routing engine until it answers, with a capped attempt count
    /// and fixed delay.
    pub async fn wait_for_upstream(&self, attempts: u32, delay: Duration) -> Result<()> {
        let mut last = "no attempts made".to_string();
        for attempt in 0..attempts.max(1) {
            match self.client.get(&self.alertmanager_url).send().await {
                Ok(_) => return Ok(()),
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "routing engine not ready");
                    last = err.to_string();
                }
            }
            tokio::time::sleep(delay).await;
        }
        Err(Error::Connectivity {
            addr: self.alertmanager_url.clone(),
            message: last,
        })
    }

    /// Ensure the file exists and carries SMTP globals; a no-op when it
    /// already does. Returns whether a write (and reload) happened.
    pub async fn bootstrap(&self, info: &InitInfo) -> Result<bool> {
        let _guard = self.lock.lock().await;
        if self.path.exists() {
            let config = self.load().await?;
            if config.smtp_initialized() {
                tracing::debug!(path = %self.path.display(), "config already initialized");
                return Ok(false);
            }
            tracing::info!(path = %self.path.display(), "config lacks smtp globals, writing defaults");
        } else {
            tracing::info!(path = %self.path.display(), "no config file, writing defaults");
        }
        let rendered = render_default_config(info)?;
        // reject template output the routing engine would choke on
        let _: AmConfig = serde_yaml::from_str(&rendered)?;
        self.write_locked(&rendered).await?;
        self.reload().await?;
        Ok(true)
    }

    /// Append a receiver and its route. Duplicate composite names conflict.
    pub async fn add_receiver(&self, pair: &ReceiverWithRoute) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut config = self.load().await?;
        if config.receiver(&pair.receiver.name).is_some() {
            return Err(Error::AlreadyExists(pair.receiver.name.clone()));
        }
        tracing::info!(receiver = %pair.receiver.name, "adding alert receiver");
        config.receivers.push(pair.receiver.clone());
        config.route.routes.push(pair.route.clone());
        self.persist(&config).await
    }

    /// Remove a receiver and its matching route. Nothing is written when the
    /// name is unknown.
    pub async fn remove_receiver(&self, name: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut config = self.load().await?;
        let before = config.receivers.len();
        config.receivers.retain(|r| r.name != name);
        if config.receivers.len() == before {
            return Err(Error::ReceiverNotFound(format!("no receiver \"{name}\"")));
        }
        config.route.routes.retain(|r| r.receiver != name);
        tracing::info!(receiver = name, "removed alert receiver");
        self.persist(&config).await
    }

    /// Every non-default receiver paired with its route. Never mutates.
    pub async fn list_receivers(&self) -> Result<Vec<ReceiverWithRoute>> {
        let _guard = self.lock.lock().await;
        let config = self.load().await?;
        let pairs = config
            .receivers
            .iter()
            .filter(|rec| rec.name != DEFAULT_RECEIVER)
            .map(|rec| ReceiverWithRoute {
                receiver: rec.clone(),
                route: config.route_for(&rec.name).cloned().unwrap_or_default(),
            })
            .collect();
        Ok(pairs)
    }

    /// Ask the routing engine to pick up the current file.
    pub async fn reload(&self) -> Result<()> {
        let url = format!("{}{}", self.alertmanager_url, RELOAD_PATH);
        let response = self.client.post(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamStatus { status, message });
        }
        metrics::record_config_reload();
        Ok(())
    }

    async fn load(&self) -> Result<AmConfig> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| Error::ConfigIo {
                path: self.path.display().to_string(),
                source,
            })?;
        Ok(serde_yaml::from_str(&text)?)
    }

    async fn persist(&self, config: &AmConfig) -> Result<()> {
        let text = serde_yaml::to_string(config)?;
        self.write_locked(&text).await?;
        self.reload().await
    }

    async fn write_locked(&self, contents: &str) -> Result<()> {
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|source| Error::ConfigIo {
                path: self.path.display().to_string(),
                source,
            })?;
        metrics::record_config_write();
        Ok(())
    }
}
