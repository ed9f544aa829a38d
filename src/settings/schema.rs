//! Settings schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::amconfig::InitInfo;
use crate::error::{Error, Result};

/// Root settings for the sidecar process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SidecarSettings {
    /// Listener configuration (bind address, optional TLS).
    pub listener: ListenerSettings,

    /// The routing engine this sidecar fronts.
    pub upstream: UpstreamSettings,

    /// Bootstrap credentials applied at startup. Optional; the control
    /// plane usually drives bootstrap through the init endpoint instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init: Option<InitInfo>,

    /// Startup probing of the routing engine.
    pub startup: StartupSettings,

    /// Timeout configuration.
    pub timeouts: TimeoutSettings,

    /// Observability settings.
    pub observability: ObservabilitySettings,
}

impl SidecarSettings {
    pub fn upstream_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.upstream.alertmanager_url)
            .map_err(|err| Error::Internal(format!("bad alertmanager url: {err}")))
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.upstream_secs)
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.startup.connect_delay_ms)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerSettings {
    /// Bind address (e.g., "127.0.0.1:9094").
    pub bind_address: String,

    /// Optional TLS termination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSettings>,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9094".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsSettings {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// The routing engine the sidecar mediates for.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Alertmanager base URL.
    pub alertmanager_url: String,

    /// Path of the managed configuration file.
    pub config_file: String,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            alertmanager_url: "http://127.0.0.1:9093".to_string(),
            config_file: "/var/lib/alertmanager/alertmanager.yml".to_string(),
        }
    }
}

/// Bounded startup probing: fixed attempt count, fixed delay.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StartupSettings {
    pub connect_attempts: u32,
    pub connect_delay_ms: u64,
}

impl Default for StartupSettings {
    fn default() -> Self {
        Self {
            connect_attempts: 10,
            connect_delay_ms: 1000,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Inbound request timeout in seconds.
    pub request_secs: u64,

    /// Outbound call timeout toward the routing engine in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilitySettings {
    /// Default log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9095".to_string(),
        }
    }
}
