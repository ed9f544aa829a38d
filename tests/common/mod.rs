//! Shared utilities for integration testing: a programmable mock
//! Alertmanager and a sidecar harness on ephemeral ports.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use tempfile::TempDir;
use tokio::net::TcpListener;

use alertmgr_sidecar::amconfig::InitInfo;
use alertmgr_sidecar::creds::{SmtpCredentials, StaticCredentials};
use alertmgr_sidecar::lifecycle::Shutdown;
use alertmgr_sidecar::model::{AlertReceiver, AppInstScope, CloudletScope, ReceiverKind, Severity};
use alertmgr_sidecar::settings::SidecarSettings;
use alertmgr_sidecar::store::ConfigStore;
use alertmgr_sidecar::SidecarServer;

/// Observable state of the mock routing engine.
#[derive(Clone, Default)]
pub struct MockState {
    alerts: Arc<Mutex<Vec<serde_json::Value>>>,
    alert_posts: Arc<AtomicUsize>,
    reloads: Arc<AtomicUsize>,
}

impl MockState {
    /// Current alert set, merged by label set like the real engine.
    pub fn alerts(&self) -> Vec<serde_json::Value> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn alert_names(&self) -> Vec<String> {
        self.alerts()
            .iter()
            .filter_map(|a| a["labels"]["alertname"].as_str().map(String::from))
            .collect()
    }

    pub fn alert_posts(&self) -> usize {
        self.alert_posts.load(Ordering::SeqCst)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

pub struct MockAlertmanager {
    pub addr: SocketAddr,
    pub state: MockState,
}

pub async fn start_mock_alertmanager() -> MockAlertmanager {
    let state = MockState::default();
    let app = Router::new()
        .route("/", get(|| async { "Alertmanager is Healthy" }))
        .route("/api/v2/alerts", get(get_alerts).post(post_alerts))
        .route("/-/reload", post(reload))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockAlertmanager { addr, state }
}

async fn get_alerts(State(state): State<MockState>) -> Json<Vec<serde_json::Value>> {
    Json(state.alerts())
}

async fn post_alerts(
    State(state): State<MockState>,
    Json(batch): Json<Vec<serde_json::Value>>,
) -> &'static str {
    state.alert_posts.fetch_add(1, Ordering::SeqCst);
    let mut alerts = state.alerts.lock().unwrap();
    for alert in batch {
        let labels = alert.get("labels").cloned();
        alerts.retain(|existing| existing.get("labels").cloned() != labels);
        alerts.push(alert);
    }
    "ok"
}

async fn reload(State(state): State<MockState>) -> &'static str {
    state.reloads.fetch_add(1, Ordering::SeqCst);
    "ok"
}

/// A sidecar wired to a mock routing engine, serving on an ephemeral port
/// with its managed file in a temp directory.
pub struct SidecarHarness {
    pub base_url: String,
    pub config_path: std::path::PathBuf,
    pub store: Arc<ConfigStore>,
    pub shutdown: Shutdown,
    _config_dir: TempDir,
}

pub async fn start_sidecar(upstream: SocketAddr) -> SidecarHarness {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("alertmanager.yml");

    let mut settings = SidecarSettings::default();
    settings.upstream.alertmanager_url = format!("http://{upstream}");
    settings.upstream.config_file = config_path.display().to_string();

    let store = Arc::new(
        ConfigStore::new(
            &settings.upstream.config_file,
            &settings.upstream.alertmanager_url,
            Duration::from_secs(5),
        )
        .unwrap(),
    );

    let server = SidecarServer::new(&settings, store.clone()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let shutdown_listener = shutdown.listener();
    tokio::spawn(async move {
        server.run(listener, shutdown_listener).await.unwrap();
    });

    SidecarHarness {
        base_url: format!("http://{addr}"),
        config_path,
        store,
        shutdown,
        _config_dir: dir,
    }
}

pub fn test_init_info() -> InitInfo {
    InitInfo {
        email: "a@b.com".to_string(),
        user: "mailer".to_string(),
        token: "hunter2".to_string(),
        smtp: "localhost".to_string(),
        port: "25".to_string(),
        tls: String::new(),
        resolve_timeout: "3m".to_string(),
    }
}

pub fn test_credentials() -> StaticCredentials {
    StaticCredentials(SmtpCredentials {
        email: "a@b.com".to_string(),
        user: "mailer".to_string(),
        token: "hunter2".to_string(),
        smtp_host: "localhost".to_string(),
        smtp_port: "25".to_string(),
        require_tls: None,
    })
}

pub fn email_receiver(name: &str) -> AlertReceiver {
    AlertReceiver {
        name: name.to_string(),
        user: "u1".to_string(),
        severity: Severity::Error,
        kind: ReceiverKind::Email,
        email: "u1@x.com".to_string(),
        app_inst: AppInstScope {
            organization: "acme".to_string(),
            name: "shop".to_string(),
            version: "1.0".to_string(),
            ..AppInstScope::default()
        },
        ..AlertReceiver::default()
    }
}

pub fn slack_receiver(name: &str) -> AlertReceiver {
    AlertReceiver {
        name: name.to_string(),
        user: "u2".to_string(),
        severity: Severity::Warning,
        kind: ReceiverKind::Slack,
        slack_channel: "#alerts".to_string(),
        slack_webhook: "https://hooks.example.com/services/T0/B0".to_string(),
        cloudlet: CloudletScope {
            organization: "op1".to_string(),
            name: "edge7".to_string(),
        },
        ..AlertReceiver::default()
    }
}

/// Poll until `condition` holds or the deadline passes.
pub async fn wait_until<F: Fn() -> bool>(condition: F, deadline: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
