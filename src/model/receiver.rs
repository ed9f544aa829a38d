//! Receiver identity, scopes, and the route-label encoding.
//!
//! # Design Decisions
//! - Receiver identity is a structured 4-field key (`ReceiverId`), not a
//!   string that gets re-split; the rendered on-disk name is a pure
//!   presentation of it
//! - The route match map carries an explicit `scope` tag; reconstruction
//!   dispatches on the tag, never on which coordinate keys happen to exist
//! - Filtering is a dedicated all-optional type so "unset" is unambiguous

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// Route match-label keys shared with the routing engine configuration.
pub const LABEL_SCOPE: &str = "scope";
pub const SCOPE_APP: &str = "app";
pub const SCOPE_CLOUDLET: &str = "cloudlet";
pub const LABEL_REGION: &str = "region";
pub const LABEL_APP_ORG: &str = "apporg";
pub const LABEL_APP_NAME: &str = "app";
pub const LABEL_APP_VERSION: &str = "appver";
pub const LABEL_CLUSTER: &str = "cluster";
pub const LABEL_CLUSTER_ORG: &str = "clusterorg";
pub const LABEL_CLOUDLET: &str = "cloudlet";
pub const LABEL_CLOUDLET_ORG: &str = "cloudletorg";

/// Separator in the rendered receiver name. Free-form identity fields must
/// never contain it, or the name stops splitting into exactly four parts.
const ID_SEPARATOR: char = '-';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(s)
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(Error::InvalidReceiver(format!(
                "unknown severity \"{other}\" (expected info, warning or error)"
            ))),
        }
    }
}

/// Notification target type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiverKind {
    Email,
    Slack,
    Pagerduty,
}

impl fmt::Display for ReceiverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReceiverKind::Email => "email",
            ReceiverKind::Slack => "slack",
            ReceiverKind::Pagerduty => "pagerduty",
        };
        f.write_str(s)
    }
}

impl FromStr for ReceiverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "email" => Ok(ReceiverKind::Email),
            "slack" => Ok(ReceiverKind::Slack),
            "pagerduty" => Ok(ReceiverKind::Pagerduty),
            other => Err(Error::InvalidReceiver(format!(
                "unsupported receiver type \"{other}\""
            ))),
        }
    }
}

/// Structured identity of a managed receiver.
///
/// The routing engine only stores a flat receiver name, so `Display` joins
/// the four fields with `-` and `FromStr` splits them back. `name` and
/// `user` reject `-` and `:` to keep that encoding lossless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverId {
    pub name: String,
    pub user: String,
    pub severity: Severity,
    pub kind: ReceiverKind,
}

impl ReceiverId {
    pub fn new(
        name: impl Into<String>,
        user: impl Into<String>,
        severity: Severity,
        kind: ReceiverKind,
    ) -> Result<Self, Error> {
        let name = name.into();
        let user = user.into();
        check_id_field("name", &name)?;
        check_id_field("user", &user)?;
        Ok(Self {
            name,
            user,
            severity,
            kind,
        })
    }
}

fn check_id_field(field: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::InvalidReceiver(format!("receiver {field} must not be empty")));
    }
    if value.contains([ID_SEPARATOR, ':']) {
        return Err(Error::InvalidReceiver(format!(
            "receiver {field} cannot contain \"-\" or \":\""
        )));
    }
    Ok(())
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.name,
            self.user,
            self.severity,
            self.kind,
            sep = ID_SEPARATOR
        )
    }
}

impl FromStr for ReceiverId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let parts: Vec<&str> = s.split(ID_SEPARATOR).collect();
        let &[name, user, severity, kind] = parts.as_slice() else {
            return Err(Error::InvalidReceiver(format!(
                "unable to parse receiver name \"{s}\""
            )));
        };
        ReceiverId::new(name, user, severity.parse()?, kind.parse()?)
    }
}

/// Scope pinning a receiver to one application instance (or a slice of one,
/// when only some coordinates are set).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInstScope {
    pub organization: String,
    pub name: String,
    pub version: String,
    pub cluster: String,
    pub cluster_organization: String,
    pub cloudlet: String,
    pub cloudlet_organization: String,
}

/// Scope pinning a receiver to a cloudlet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudletScope {
    pub organization: String,
    pub name: String,
}

/// A named notification target as the control plane sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertReceiver {
    pub name: String,
    pub user: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: ReceiverKind,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slack_channel: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub slack_webhook: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pagerduty_integration_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub pagerduty_api_version: String,
    pub app_inst: AppInstScope,
    pub cloudlet: CloudletScope,
}

impl Default for AlertReceiver {
    fn default() -> Self {
        Self {
            name: String::new(),
            user: String::new(),
            severity: Severity::Error,
            kind: ReceiverKind::Email,
            region: String::new(),
            email: String::new(),
            slack_channel: String::new(),
            slack_webhook: String::new(),
            pagerduty_integration_key: String::new(),
            pagerduty_api_version: String::new(),
            app_inst: AppInstScope::default(),
            cloudlet: CloudletScope::default(),
        }
    }
}

impl AlertReceiver {
    /// Validated structured identity.
    pub fn id(&self) -> Result<ReceiverId, Error> {
        ReceiverId::new(self.name.clone(), self.user.clone(), self.severity, self.kind)
    }

    pub fn from_id(id: &ReceiverId) -> Self {
        Self {
            name: id.name.clone(),
            user: id.user.clone(),
            severity: id.severity,
            kind: id.kind,
            ..Self::default()
        }
    }

    /// Render the route match-label map for this receiver's scope.
    ///
    /// Exactly one scope must be populated (non-empty organization); the map
    /// always carries the `scope` tag alongside the coordinate labels.
    pub fn route_match_labels(&self) -> Result<BTreeMap<String, String>, Error> {
        let mut labels = BTreeMap::new();
        if !self.region.is_empty() {
            labels.insert(LABEL_REGION.to_string(), self.region.clone());
        }
        if !self.cloudlet.organization.is_empty() {
            labels.insert(LABEL_SCOPE.to_string(), SCOPE_CLOUDLET.to_string());
            labels.insert(LABEL_CLOUDLET_ORG.to_string(), self.cloudlet.organization.clone());
            insert_if_set(&mut labels, LABEL_CLOUDLET, &self.cloudlet.name);
        } else if !self.app_inst.organization.is_empty() {
            labels.insert(LABEL_SCOPE.to_string(), SCOPE_APP.to_string());
            labels.insert(LABEL_APP_ORG.to_string(), self.app_inst.organization.clone());
            insert_if_set(&mut labels, LABEL_APP_NAME, &self.app_inst.name);
            insert_if_set(&mut labels, LABEL_APP_VERSION, &self.app_inst.version);
            insert_if_set(&mut labels, LABEL_CLUSTER, &self.app_inst.cluster);
            insert_if_set(&mut labels, LABEL_CLUSTER_ORG, &self.app_inst.cluster_organization);
            insert_if_set(&mut labels, LABEL_CLOUDLET, &self.app_inst.cloudlet);
            insert_if_set(
                &mut labels,
                LABEL_CLOUDLET_ORG,
                &self.app_inst.cloudlet_organization,
            );
        } else {
            return Err(Error::InvalidReceiver(
                "receiver must name an application or cloudlet scope".to_string(),
            ));
        }
        Ok(labels)
    }

    /// Rebuild scope fields from a persisted route's match map.
    ///
    /// Routes without a recognized `scope` tag were not written by us; their
    /// scope is left empty rather than guessed from stray keys.
    pub fn apply_match_labels(&mut self, labels: &BTreeMap<String, String>) {
        if let Some(region) = labels.get(LABEL_REGION) {
            self.region = region.clone();
        }
        match labels.get(LABEL_SCOPE).map(String::as_str) {
            Some(SCOPE_CLOUDLET) => {
                copy_label(labels, LABEL_CLOUDLET_ORG, &mut self.cloudlet.organization);
                copy_label(labels, LABEL_CLOUDLET, &mut self.cloudlet.name);
            }
            Some(SCOPE_APP) => {
                copy_label(labels, LABEL_APP_ORG, &mut self.app_inst.organization);
                copy_label(labels, LABEL_APP_NAME, &mut self.app_inst.name);
                copy_label(labels, LABEL_APP_VERSION, &mut self.app_inst.version);
                copy_label(labels, LABEL_CLUSTER, &mut self.app_inst.cluster);
                copy_label(labels, LABEL_CLUSTER_ORG, &mut self.app_inst.cluster_organization);
                copy_label(labels, LABEL_CLOUDLET, &mut self.app_inst.cloudlet);
                copy_label(
                    labels,
                    LABEL_CLOUDLET_ORG,
                    &mut self.app_inst.cloudlet_organization,
                );
            }
            _ => {}
        }
    }
}

fn insert_if_set(labels: &mut BTreeMap<String, String>, key: &str, value: &str) {
    if !value.is_empty() {
        labels.insert(key.to_string(), value.to_string());
    }
}

fn copy_label(labels: &BTreeMap<String, String>, key: &str, target: &mut String) {
    if let Some(value) = labels.get(key) {
        *target = value.clone();
    }
}

/// Client-side receiver filter. Unset fields are wildcards; scope coordinate
/// fields use the empty string as the wildcard, mirroring the scope structs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverFilter {
    pub name: Option<String>,
    pub user: Option<String>,
    pub severity: Option<Severity>,
    #[serde(rename = "type")]
    pub kind: Option<ReceiverKind>,
    pub region: Option<String>,
    pub email: Option<String>,
    pub slack_channel: Option<String>,
    pub app_inst: AppInstScope,
    pub cloudlet: CloudletScope,
}

impl ReceiverFilter {
    pub fn matches(&self, receiver: &AlertReceiver) -> bool {
        field_matches(&self.name, &receiver.name)
            && field_matches(&self.user, &receiver.user)
            && self.severity.map_or(true, |s| s == receiver.severity)
            && self.kind.map_or(true, |k| k == receiver.kind)
            && field_matches(&self.region, &receiver.region)
            && field_matches(&self.email, &receiver.email)
            && field_matches(&self.slack_channel, &receiver.slack_channel)
            && scope_matches(&self.app_inst.organization, &receiver.app_inst.organization)
            && scope_matches(&self.app_inst.name, &receiver.app_inst.name)
            && scope_matches(&self.app_inst.version, &receiver.app_inst.version)
            && scope_matches(&self.app_inst.cluster, &receiver.app_inst.cluster)
            && scope_matches(
                &self.app_inst.cluster_organization,
                &receiver.app_inst.cluster_organization,
            )
            && scope_matches(&self.app_inst.cloudlet, &receiver.app_inst.cloudlet)
            && scope_matches(
                &self.app_inst.cloudlet_organization,
                &receiver.app_inst.cloudlet_organization,
            )
            && scope_matches(&self.cloudlet.organization, &receiver.cloudlet.organization)
            && scope_matches(&self.cloudlet.name, &receiver.cloudlet.name)
    }
}

fn field_matches(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().map_or(true, |f| f == value)
}

fn scope_matches(filter: &str, value: &str) -> bool {
    filter.is_empty() || filter == value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_receiver() -> AlertReceiver {
        AlertReceiver {
            name: "org1".to_string(),
            user: "u1".to_string(),
            severity: Severity::Error,
            kind: ReceiverKind::Email,
            email: "u1@example.com".to_string(),
            region: "EU".to_string(),
            app_inst: AppInstScope {
                organization: "acme".to_string(),
                name: "shop".to_string(),
                version: "1.0".to_string(),
                cluster: "c9".to_string(),
                cluster_organization: "acme".to_string(),
                cloudlet: "edge1".to_string(),
                cloudlet_organization: "op1".to_string(),
            },
            ..AlertReceiver::default()
        }
    }

    #[test]
    fn test_id_round_trip() {
        let id = ReceiverId::new("org1", "u1", Severity::Error, ReceiverKind::Email).unwrap();
        assert_eq!(id.to_string(), "org1-u1-error-email");
        let parsed: ReceiverId = "org1-u1-error-email".parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_id_rejects_separator_characters() {
        assert!(ReceiverId::new("bad-name", "u1", Severity::Info, ReceiverKind::Slack).is_err());
        assert!(ReceiverId::new("name", "a:b", Severity::Info, ReceiverKind::Slack).is_err());
        assert!(ReceiverId::new("", "u1", Severity::Info, ReceiverKind::Slack).is_err());
    }

    #[test]
    fn test_id_parse_requires_four_segments() {
        assert!("only-three-parts".parse::<ReceiverId>().is_err());
        assert!("a-b-c-d-e".parse::<ReceiverId>().is_err());
        assert!("a-b-silly-email".parse::<ReceiverId>().is_err());
        assert!("a-b-error-carrierpigeon".parse::<ReceiverId>().is_err());
    }

    #[test]
    fn test_app_scope_labels_round_trip() {
        let receiver = app_receiver();
        let labels = receiver.route_match_labels().unwrap();
        assert_eq!(labels.get(LABEL_SCOPE).map(String::as_str), Some(SCOPE_APP));
        assert_eq!(labels.get(LABEL_APP_ORG).map(String::as_str), Some("acme"));
        assert_eq!(labels.get(LABEL_REGION).map(String::as_str), Some("EU"));

        let id = receiver.id().unwrap();
        let mut rebuilt = AlertReceiver::from_id(&id);
        rebuilt.apply_match_labels(&labels);
        assert_eq!(rebuilt.app_inst, receiver.app_inst);
        assert_eq!(rebuilt.region, receiver.region);
        assert_eq!(rebuilt.cloudlet, CloudletScope::default());
    }

    #[test]
    fn test_cloudlet_scope_labels_round_trip() {
        let receiver = AlertReceiver {
            name: "ops".to_string(),
            user: "u2".to_string(),
            severity: Severity::Warning,
            kind: ReceiverKind::Slack,
            slack_channel: "#alerts".to_string(),
            slack_webhook: "https://hooks.example.com/T000/B000".to_string(),
            cloudlet: CloudletScope {
                organization: "op1".to_string(),
                name: "edge7".to_string(),
            },
            ..AlertReceiver::default()
        };
        let labels = receiver.route_match_labels().unwrap();
        assert_eq!(labels.get(LABEL_SCOPE).map(String::as_str), Some(SCOPE_CLOUDLET));

        let mut rebuilt = AlertReceiver::from_id(&receiver.id().unwrap());
        rebuilt.apply_match_labels(&labels);
        assert_eq!(rebuilt.cloudlet, receiver.cloudlet);
        assert_eq!(rebuilt.app_inst, AppInstScope::default());
    }

    #[test]
    fn test_scope_is_required() {
        let receiver = AlertReceiver {
            name: "nowhere".to_string(),
            user: "u1".to_string(),
            ..AlertReceiver::default()
        };
        assert!(receiver.route_match_labels().is_err());
    }

    #[test]
    fn test_unknown_scope_tag_leaves_scope_empty() {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_APP_ORG.to_string(), "acme".to_string());
        let mut receiver = AlertReceiver::default();
        receiver.apply_match_labels(&labels);
        assert_eq!(receiver.app_inst, AppInstScope::default());
    }

    #[test]
    fn test_filter_matching() {
        let receiver = app_receiver();

        assert!(ReceiverFilter::default().matches(&receiver));
        assert!(ReceiverFilter {
            kind: Some(ReceiverKind::Email),
            ..ReceiverFilter::default()
        }
        .matches(&receiver));
        assert!(!ReceiverFilter {
            kind: Some(ReceiverKind::Slack),
            ..ReceiverFilter::default()
        }
        .matches(&receiver));
        assert!(ReceiverFilter {
            app_inst: AppInstScope {
                organization: "acme".to_string(),
                ..AppInstScope::default()
            },
            ..ReceiverFilter::default()
        }
        .matches(&receiver));
        assert!(!ReceiverFilter {
            app_inst: AppInstScope {
                organization: "someone-else".to_string(),
                ..AppInstScope::default()
            },
            ..ReceiverFilter::default()
        }
        .matches(&receiver));
    }
}
