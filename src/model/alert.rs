//! Alerts and their Alertmanager v2 wire shapes.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label every alert must carry.
pub const LABEL_ALERT_NAME: &str = "alertname";

/// An active condition owned by the control plane.
///
/// The sidecar never creates or resolves alerts. It mirrors the control
/// plane's cache outward; an alert that stops being refreshed expires at its
/// last-pushed `endsAt` on the routing engine's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub active_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(name: impl Into<String>, active_at: DateTime<Utc>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_ALERT_NAME.to_string(), name.into());
        Self {
            labels,
            annotations: BTreeMap::new(),
            active_at,
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Cache identity: the full label set.
    pub fn key(&self) -> BTreeMap<String, String> {
        self.labels.clone()
    }

    pub fn name(&self) -> Option<&str> {
        self.labels.get(LABEL_ALERT_NAME).map(String::as_str)
    }

    /// Wire shape for POST /api/v2/alerts. `endsAt` rolls forward on every
    /// refresh; it is the only resolution mechanism.
    pub fn to_postable(&self, ends_at: DateTime<Utc>) -> PostableAlert {
        PostableAlert {
            labels: self.labels.clone(),
            annotations: self.annotations.clone(),
            starts_at: self.active_at,
            ends_at,
        }
    }
}

/// Alert as submitted to the routing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostableAlert {
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

/// Alert as returned by GET /api/v2/alerts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GettableAlert {
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl From<GettableAlert> for Alert {
    fn from(wire: GettableAlert) -> Self {
        Self {
            labels: wire.labels,
            annotations: wire.annotations,
            active_at: wire.starts_at.unwrap_or_else(Utc::now),
        }
    }
}
