//! Control-plane facing server: the alert refresh loop and receiver
//! management.
//!
//! # Responsibilities
//! - Re-assert the cached alert set into the routing engine every interval
//!   so unresolved alerts never expire (rolling endsAt)
//! - Push a changed alert immediately, off the cache's update stream
//! - Validate and relay receiver CRUD through the sidecar's control API
//!
//! RBAC is not handled here; callers gate access before reaching this type.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::amconfig::{self, template, ReceiverWithRoute, Route, DEFAULT_RECEIVER};
use crate::creds::CredentialsSource;
use crate::error::{Error, Result};
use crate::http::{ALERTS_PATH, SIDECAR_INIT_PATH, SIDECAR_RECEIVERS_PATH, SIDECAR_RECEIVER_PATH};
use crate::mgr::cache::AlertCache;
use crate::mgr::client::ApiClient;
use crate::model::{Alert, AlertReceiver, GettableAlert, PostableAlert, ReceiverFilter, ReceiverId, ReceiverKind};
use crate::observability::metrics;

/// Default refresh cadence; capped at a third of the resolve timeout so an
/// alert is always re-asserted before its endsAt can lapse.
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Shown instead of stored secrets when receivers are read back.
const DISPLAY_HIDDEN: &str = "***";

/// Bounded startup probing of the sidecar.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    pub attempts: u32,
    pub delay: Duration,
    pub request_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(10),
        }
    }
}

fn refresh_interval_for(resolve_timeout: Duration) -> Duration {
    DEFAULT_REFRESH_INTERVAL.min(resolve_timeout / 3)
}

pub struct AlertMgrServer {
    api: ApiClient,
    cache: Arc<AlertCache>,
    resolve_timeout: Duration,
    refresh_interval: Duration,
    worker: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

impl AlertMgrServer {
    /// Probe the sidecar until it answers, fetch SMTP credentials, and run
    /// bootstrap through the init endpoint. Either step failing is fatal.
    pub async fn new(
        sidecar_addr: &str,
        cache: Arc<AlertCache>,
        resolve_timeout: Duration,
        credentials: &dyn CredentialsSource,
    ) -> Result<Self> {
        Self::with_options(
            sidecar_addr,
            cache,
            resolve_timeout,
            credentials,
            ConnectOptions::default(),
        )
        .await
    }

    pub async fn with_options(
        sidecar_addr: &str,
        cache: Arc<AlertCache>,
        resolve_timeout: Duration,
        credentials: &dyn CredentialsSource,
        options: ConnectOptions,
    ) -> Result<Self> {
        let api = ApiClient::new(sidecar_addr, options.request_timeout)?;

        let mut last = "no attempts made".to_string();
        let mut reachable = false;
        for attempt in 0..options.attempts.max(1) {
            match api.get("/").await {
                // any HTTP answer, even an error status, means it is up
                Ok(_) | Err(Error::UpstreamStatus { .. }) => {
                    reachable = true;
                    break;
                }
                Err(err) => {
                    tracing::debug!(attempt, error = %err, "sidecar not ready");
                    last = err.to_string();
                }
            }
            tokio::time::sleep(options.delay).await;
        }
        if !reachable {
            return Err(Error::Connectivity {
                addr: api.base().to_string(),
                message: last,
            });
        }

        let smtp = credentials.smtp_credentials().await?;
        let info = smtp.into_init_info(resolve_timeout);
        api.post_json(SIDECAR_INIT_PATH, &info).await?;
        tracing::info!(sidecar = api.base(), "alert manager initialized");

        Ok(Self {
            api,
            cache,
            resolve_timeout,
            refresh_interval: refresh_interval_for(resolve_timeout),
            worker: None,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Override the refresh cadence; takes effect on the next `start`.
    pub fn set_refresh_interval(&mut self, interval: Duration) {
        self.refresh_interval = interval;
    }

    /// Spawn the background refresh loop. No-op when already running.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        // subscribe here, not in the task, so an update racing start() is
        // still observed
        let updates = self.cache.subscribe();
        let handle = tokio::spawn(run_refresh_loop(
            self.api.clone(),
            self.cache.clone(),
            updates,
            self.resolve_timeout,
            self.refresh_interval,
            stop_rx,
        ));
        self.worker = Some((stop_tx, handle));
        tracing::info!(interval = ?self.refresh_interval, "alert refresh loop started");
    }

    /// Signal the refresh loop and wait for it to exit.
    pub async fn stop(&mut self) {
        if let Some((stop, handle)) = self.worker.take() {
            let _ = stop.send(true);
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "refresh task did not exit cleanly");
            }
        }
    }

    /// Push alerts now, with a rolling endsAt of now + resolve timeout.
    pub async fn add_alerts(&self, alerts: &[Alert]) -> Result<()> {
        push_alerts(&self.api, alerts, self.resolve_timeout).await
    }

    /// All alerts the routing engine currently knows. The filter is
    /// accepted for future server-side filtering; today the full set comes
    /// back.
    pub async fn show_alerts(&self, _filter: Option<&Alert>) -> Result<Vec<Alert>> {
        let body = self.api.get(ALERTS_PATH).await?;
        let wire: Vec<GettableAlert> = serde_json::from_slice(&body)?;
        Ok(wire.into_iter().map(Alert::from).collect())
    }

    /// Validate locally, then create through the sidecar. A duplicate
    /// composite name surfaces as an already-exists error.
    pub async fn create_receiver(&self, receiver: &AlertReceiver) -> Result<()> {
        let pair = build_receiver_pair(receiver)?;
        match self.api.post_json(SIDECAR_RECEIVER_PATH, &pair).await {
            Ok(_) => Ok(()),
            Err(Error::UpstreamStatus { status, .. }) if status == StatusCode::CONFLICT => {
                Err(Error::AlreadyExists(pair.receiver.name))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn delete_receiver(&self, receiver: &AlertReceiver) -> Result<()> {
        let id = receiver.id()?;
        let pair = ReceiverWithRoute {
            receiver: amconfig::Receiver {
                name: id.to_string(),
                ..amconfig::Receiver::default()
            },
            route: Route::default(),
        };
        match self.api.delete_json(SIDECAR_RECEIVER_PATH, &pair).await {
            Ok(_) => Ok(()),
            Err(Error::UpstreamStatus { status, message }) if status == StatusCode::NOT_FOUND => {
                Err(Error::ReceiverNotFound(if message.is_empty() {
                    format!(
                        "no {} receiver \"{}\" of severity {} for user \"{}\"",
                        id.kind, id.name, id.severity, id.user
                    )
                } else {
                    message
                }))
            }
            Err(err) => Err(err),
        }
    }

    /// Reconstruct receivers from the persisted pairs and filter
    /// client-side. Entries whose name does not parse are skipped, never
    /// fatal.
    pub async fn show_receivers(
        &self,
        filter: Option<&ReceiverFilter>,
    ) -> Result<Vec<AlertReceiver>> {
        let body = self.api.get(SIDECAR_RECEIVERS_PATH).await?;
        let pairs: Vec<ReceiverWithRoute> = serde_json::from_slice(&body)?;

        let mut receivers = Vec::new();
        for pair in pairs {
            if pair.receiver.name == DEFAULT_RECEIVER {
                continue;
            }
            let id: ReceiverId = match pair.receiver.name.parse() {
                Ok(id) => id,
                Err(err) => {
                    tracing::warn!(receiver = %pair.receiver.name, error = %err,
                        "skipping receiver with unparsable name");
                    continue;
                }
            };
            let mut receiver = AlertReceiver::from_id(&id);
            match id.kind {
                ReceiverKind::Email => {
                    if let Some(cfg) = pair.receiver.email_configs.first() {
                        receiver.email = cfg.to.clone();
                    }
                }
                ReceiverKind::Slack => {
                    if let Some(cfg) = pair.receiver.slack_configs.first() {
                        receiver.slack_channel = cfg.channel.clone();
                        receiver.slack_webhook = DISPLAY_HIDDEN.to_string();
                    }
                }
                ReceiverKind::Pagerduty => {
                    if let Some(cfg) = pair.receiver.pagerduty_configs.first() {
                        receiver.pagerduty_api_version = if cfg.service_key.is_empty() {
                            "v2".to_string()
                        } else {
                            "v1".to_string()
                        };
                        receiver.pagerduty_integration_key = DISPLAY_HIDDEN.to_string();
                    }
                }
            }
            receiver.apply_match_labels(&pair.route.match_labels);
            if filter.map_or(true, |f| f.matches(&receiver)) {
                receivers.push(receiver);
            }
        }
        Ok(receivers)
    }
}

/// Build the `{receiver, route}` pair a valid receiver persists as.
/// Validation failures resolve locally; nothing reaches the network.
pub fn build_receiver_pair(receiver: &AlertReceiver) -> Result<ReceiverWithRoute> {
    let id = receiver.id()?;
    let match_labels = receiver.route_match_labels()?;
    let name = id.to_string();

    let rec = match receiver.kind {
        ReceiverKind::Email => {
            if receiver.email.is_empty() || !receiver.email.contains('@') {
                return Err(Error::InvalidReceiver(format!(
                    "email receiver needs a valid address, got \"{}\"",
                    receiver.email
                )));
            }
            amconfig::Receiver {
                name: name.clone(),
                email_configs: vec![amconfig::EmailConfig {
                    send_resolved: Some(true),
                    to: receiver.email.clone(),
                    html: template::EMAIL_HTML_TEMPLATE.to_string(),
                    text: template::EMAIL_TEXT_TEMPLATE.to_string(),
                    headers: BTreeMap::from([(
                        "Subject".to_string(),
                        template::EMAIL_SUBJECT_TEMPLATE.to_string(),
                    )]),
                    ..amconfig::EmailConfig::default()
                }],
                ..amconfig::Receiver::default()
            }
        }
        ReceiverKind::Slack => {
            let webhook = url::Url::parse(&receiver.slack_webhook)
                .map_err(|_| Error::InvalidReceiver("invalid slack webhook URL".to_string()))?;
            if !webhook.scheme().starts_with("http") {
                return Err(Error::InvalidReceiver(
                    "slack webhook must be an http(s) URL".to_string(),
                ));
            }
            amconfig::Receiver {
                name: name.clone(),
                slack_configs: vec![amconfig::SlackConfig {
                    send_resolved: Some(true),
                    api_url: receiver.slack_webhook.clone(),
                    channel: receiver.slack_channel.clone(),
                    title: template::SLACK_TITLE_TEMPLATE.to_string(),
                    text: template::SLACK_TEXT_TEMPLATE.to_string(),
                    fallback: template::SLACK_FALLBACK_TEMPLATE.to_string(),
                    ..amconfig::SlackConfig::default()
                }],
                ..amconfig::Receiver::default()
            }
        }
        ReceiverKind::Pagerduty => {
            if receiver.pagerduty_integration_key.is_empty() {
                return Err(Error::InvalidReceiver(
                    "pagerduty receiver needs an integration key".to_string(),
                ));
            }
            let mut cfg = amconfig::PagerdutyConfig {
                send_resolved: Some(true),
                description: template::PAGERDUTY_DESCRIPTION_TEMPLATE.to_string(),
                severity: receiver.severity.to_string(),
                ..amconfig::PagerdutyConfig::default()
            };
            match receiver.pagerduty_api_version.as_str() {
                "" | "v2" => cfg.routing_key = receiver.pagerduty_integration_key.clone(),
                "v1" => cfg.service_key = receiver.pagerduty_integration_key.clone(),
                other => {
                    return Err(Error::InvalidReceiver(format!(
                        "pagerduty api version must be \"v1\" or \"v2\", got \"{other}\""
                    )))
                }
            }
            amconfig::Receiver {
                name: name.clone(),
                pagerduty_configs: vec![cfg],
                ..amconfig::Receiver::default()
            }
        }
    };

    let route = Route {
        receiver: name,
        match_labels,
        r#continue: false,
        ..Route::default()
    };
    Ok(ReceiverWithRoute {
        receiver: rec,
        route,
    })
}

async fn run_refresh_loop(
    api: ApiClient,
    cache: Arc<AlertCache>,
    mut updates: broadcast::Receiver<Alert>,
    resolve_timeout: Duration,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick fires immediately; the loop should wait a full interval
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let alerts = cache.snapshot();
                if alerts.is_empty() {
                    continue;
                }
                tracing::debug!(count = alerts.len(), "refreshing alert set");
                if let Err(err) = push_alerts(&api, &alerts, resolve_timeout).await {
                    metrics::record_refresh_error();
                    tracing::warn!(error = %err, "failed to refresh alerts");
                }
            }
            update = updates.recv() => match update {
                Ok(alert) => {
                    if let Err(err) = push_alerts(&api, std::slice::from_ref(&alert), resolve_timeout).await {
                        metrics::record_refresh_error();
                        tracing::warn!(error = %err, "failed to push updated alert");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // the next tick re-pushes the whole set anyway
                    tracing::warn!(skipped, "alert update stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = stop.changed() => {
                tracing::info!("alert refresh loop stopping");
                break;
            }
        }
    }
}

async fn push_alerts(api: &ApiClient, alerts: &[Alert], resolve_timeout: Duration) -> Result<()> {
    let resolve = chrono::Duration::from_std(resolve_timeout)
        .map_err(|err| Error::Internal(format!("resolve timeout out of range: {err}")))?;
    let ends_at = Utc::now() + resolve;

    let batch: Vec<PostableAlert> = alerts
        .iter()
        .filter_map(|alert| {
            if alert.name().is_none() {
                tracing::debug!(labels = ?alert.labels, "skipping alert without alertname");
                return None;
            }
            Some(alert.to_postable(ends_at))
        })
        .collect();
    if batch.is_empty() {
        return Ok(());
    }
    api.post_json(ALERTS_PATH, &batch).await?;
    metrics::record_alerts_pushed(batch.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppInstScope, Severity};

    fn email_receiver() -> AlertReceiver {
        AlertReceiver {
            name: "org1".to_string(),
            user: "u1".to_string(),
            severity: Severity::Error,
            kind: ReceiverKind::Email,
            email: "u1@example.com".to_string(),
            app_inst: AppInstScope {
                organization: "acme".to_string(),
                ..AppInstScope::default()
            },
            ..AlertReceiver::default()
        }
    }

    #[test]
    fn test_refresh_interval_capped_by_resolve_timeout() {
        assert_eq!(
            refresh_interval_for(Duration::from_secs(600)),
            Duration::from_secs(30)
        );
        assert_eq!(
            refresh_interval_for(Duration::from_secs(30)),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_build_email_pair() {
        let pair = build_receiver_pair(&email_receiver()).unwrap();
        assert_eq!(pair.receiver.name, "org1-u1-error-email");
        assert_eq!(pair.receiver.email_configs.len(), 1);
        assert_eq!(pair.receiver.email_configs[0].to, "u1@example.com");
        assert!(!pair.route.r#continue);
        assert_eq!(pair.route.receiver, pair.receiver.name);
        assert_eq!(
            pair.route.match_labels.get("apporg").map(String::as_str),
            Some("acme")
        );
    }

    #[test]
    fn test_email_address_required() {
        let mut receiver = email_receiver();
        receiver.email = "not an address".to_string();
        assert!(matches!(
            build_receiver_pair(&receiver),
            Err(Error::InvalidReceiver(_))
        ));
    }

    #[test]
    fn test_slack_webhook_must_be_url() {
        let receiver = AlertReceiver {
            kind: ReceiverKind::Slack,
            slack_webhook: "definitely not a url".to_string(),
            slack_channel: "#alerts".to_string(),
            ..email_receiver()
        };
        assert!(matches!(
            build_receiver_pair(&receiver),
            Err(Error::InvalidReceiver(_))
        ));
    }

    #[test]
    fn test_pagerduty_key_lands_by_api_version(){
        let mut receiver = AlertReceiver {
            kind: ReceiverKind::Pagerduty,
            pagerduty_integration_key: "k3y".to_string(),
            ..email_receiver()
        };
        let pair = build_receiver_pair(&receiver).unwrap();
        assert_eq!(pair.receiver.pagerduty_configs[0].routing_key, "k3y");

        receiver.pagerduty_api_version = "v1".to_string();
        let pair = build_receiver_pair(&receiver).unwrap();
        assert_eq!(pair.receiver.pagerduty_configs[0].service_key, "k3y");

        receiver.pagerduty_api_version = "v3".to_string();
        assert!(build_receiver_pair(&receiver).is_err());
    }

    #[test]
    fn test_reserved_characters_rejected_before_network() {
        let receiver = AlertReceiver {
            name: "with-dash".to_string(),
            ..email_receiver()
        };
        assert!(matches!(
            build_receiver_pair(&receiver),
            Err(Error::InvalidReceiver(_))
        ));
    }
}
