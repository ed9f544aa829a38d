//! Alertmanager sidecar daemon.
//!
//! ```text
//!  control plane ──HTTP──▶ ┌──────────────────────────────┐
//!                          │           SIDECAR            │
//!                          │  init / receiver CRUD        │      ┌──────────────┐
//!                          │    └─▶ ConfigStore ──────────┼──────▶ alertmanager │
//!                          │          (yml + /-/reload)   │      │   (upstream) │
//!                          │  alerts / silences           │      └──────────────┘
//!                          │    └─▶ ReverseProxy ─────────┼─────────────▲
//!                          └──────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use alertmgr_sidecar::lifecycle::{self, Shutdown};
use alertmgr_sidecar::observability;
use alertmgr_sidecar::settings::{load_settings, SidecarSettings};
use alertmgr_sidecar::store::ConfigStore;
use alertmgr_sidecar::SidecarServer;

#[derive(Parser, Debug)]
#[command(
    name = "alertmgr-sidecar",
    about = "Mediates between a control plane and an Alertmanager instance",
    version
)]
struct Cli {
    /// Path to the sidecar settings file (TOML).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Listen address override.
    #[arg(long)]
    listen: Option<String>,

    /// Alertmanager base URL override.
    #[arg(long)]
    alertmanager_url: Option<String>,

    /// Managed configuration file override.
    #[arg(long)]
    config_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => SidecarSettings::default(),
    };
    if let Some(listen) = cli.listen {
        settings.listener.bind_address = listen;
    }
    if let Some(url) = cli.alertmanager_url {
        settings.upstream.alertmanager_url = url;
    }
    if let Some(path) = cli.config_file {
        settings.upstream.config_file = path;
    }

    observability::logging::init(&settings.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %settings.listener.bind_address,
        alertmanager = %settings.upstream.alertmanager_url,
        config_file = %settings.upstream.config_file,
        "alertmgr-sidecar starting"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(err) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                error = %err,
                "failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(ConfigStore::new(
        &settings.upstream.config_file,
        &settings.upstream.alertmanager_url,
        settings.upstream_timeout(),
    )?);

    store
        .wait_for_upstream(settings.startup.connect_attempts, settings.connect_delay())
        .await?;

    // pick up any file changes made while we were down; bootstrap already
    // reloads when it writes
    let wrote = match &settings.init {
        Some(init) => store.bootstrap(init).await?,
        None => false,
    };
    if !wrote {
        store.reload().await?;
    }

    let shutdown = Shutdown::new();
    lifecycle::spawn_signal_listener(shutdown.clone());

    let server = SidecarServer::new(&settings, store)?;
    let addr: SocketAddr = settings.listener.bind_address.parse()?;

    match &settings.listener.tls {
        Some(tls) => {
            let rustls =
                axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
                    .await?;
            let handle = axum_server::Handle::new();
            let mut listener = shutdown.listener();
            let drain = handle.clone();
            tokio::spawn(async move {
                listener.recv().await;
                drain.graceful_shutdown(Some(Duration::from_secs(10)));
            });
            tracing::info!(address = %addr, "sidecar HTTPS server starting");
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(server.into_router().into_make_service())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            server.run(listener, shutdown.listener()).await?;
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}
