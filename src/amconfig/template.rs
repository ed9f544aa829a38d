//! Default configuration rendering and notification templates.
//!
//! The default file is kept as a handlebars template rendered with the
//! bootstrap credentials, so the generated YAML stays auditable as a whole
//! document instead of being assembled from string fragments. The
//! notification templates below are Go templates executed by the routing
//! engine itself; to us they are opaque data attached to receivers.

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Bootstrap credentials accepted by the sidecar init endpoint.
///
/// All fields are strings on the wire; `tls` is rendered only when
/// non-empty so the routing engine's own default applies otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitInfo {
    pub email: String,
    pub user: String,
    pub token: String,
    pub smtp: String,
    pub port: String,
    pub tls: String,
    pub resolve_timeout: String,
}

// Notes on the defaults:
//   resolve_timeout - refreshed well inside this window, see the manager's
//                     interval cap
//   group_wait      - no grouping yet, 1s sends alerts near-instantly
//   group_interval  - inert while group_wait stays this small
//   repeat_interval - re-notify every 2h until resolved
const DEFAULT_CONFIG_TEMPLATE: &str = r#"global:
  resolve_timeout: {{resolveTimeout}}
  smtp_from: "{{email}}"
  smtp_smarthost: {{smtp}}:{{port}}
  smtp_auth_username: "{{user}}"
  smtp_auth_identity: "{{user}}"
  smtp_auth_password: "{{token}}"
{{#if tls}}  smtp_require_tls: {{tls}}
{{/if}}route:
  group_wait: 1s
  group_interval: 1s
  repeat_interval: 2h
  receiver: default
receivers:
- name: default
"#;

const DEFAULT_RESOLVE_TIMEOUT: &str = "5m";

/// Render the default configuration for a fresh or half-initialized file.
pub fn render_default_config(info: &InitInfo) -> Result<String> {
    let mut info = info.clone();
    if info.resolve_timeout.is_empty() {
        info.resolve_timeout = DEFAULT_RESOLVE_TIMEOUT.to_string();
    }
    let mut registry = Handlebars::new();
    // credentials land in YAML, not HTML
    registry.register_escape_fn(handlebars::no_escape);
    Ok(registry.render_template(DEFAULT_CONFIG_TEMPLATE, &info)?)
}

/// Email subject; rendered by the routing engine per notification group.
pub const EMAIL_SUBJECT_TEMPLATE: &str = r#"[{{ .Status | toUpper }}{{ if eq .Status "firing" }}:{{ .Alerts.Firing | len }}{{ end }}] {{ .CommonLabels.alertname }}"#;

/// Plain-text email body.
pub const EMAIL_TEXT_TEMPLATE: &str = r#"
Monitoring: {{ .Alerts | len }} alert{{ if gt (len .Alerts) 1 }}s{{ end }} for {{ range .GroupLabels.SortedPairs }}
  {{ .Name }}={{ .Value }}
{{ end }}
{{ if gt (len .Alerts.Firing) 0 }}
  [{{ .Alerts.Firing | len }}] Firing
{{ end }}
{{ if gt (len .Alerts.Resolved) 0 }}
  [{{ .Alerts.Resolved | len }}] Resolved
{{ end }}
"#;

/// HTML email body; labels and annotations per alert, firing before
/// resolved.
pub const EMAIL_HTML_TEMPLATE: &str = r#"<html>
<body>
<h2>{{ .Alerts | len }} alert{{ if gt (len .Alerts) 1 }}s{{ end }} for {{ range .GroupLabels.SortedPairs }}{{ .Name }}={{ .Value }} {{ end }}</h2>
{{ if gt (len .Alerts.Firing) 0 }}<h3>[{{ .Alerts.Firing | len }}] Firing</h3>{{ end }}
{{ range .Alerts.Firing }}
<p><b>Labels</b><br/>
{{ range .Labels.SortedPairs }}{{ .Name }} = {{ .Value }}<br/>{{ end }}
{{ if gt (len .Annotations) 0 }}<b>Annotations</b><br/>{{ end }}
{{ range .Annotations.SortedPairs }}{{ .Name }} = {{ .Value }}<br/>{{ end }}</p>
{{ end }}
{{ if gt (len .Alerts.Resolved) 0 }}<h3>[{{ .Alerts.Resolved | len }}] Resolved</h3>{{ end }}
{{ range .Alerts.Resolved }}
<p><b>Labels</b><br/>
{{ range .Labels.SortedPairs }}{{ .Name }} = {{ .Value }}<br/>{{ end }}</p>
{{ end }}
</body>
</html>
"#;

pub const SLACK_TITLE_TEMPLATE: &str =
    r#"[{{ .Status | toUpper }}{{ if eq .Status "firing" }}:{{ .Alerts.Firing | len }}{{ end }}] {{ .CommonLabels.alertname }}"#;

pub const SLACK_TEXT_TEMPLATE: &str = r#"{{ range .Alerts }}{{ range .Labels.SortedPairs }}{{ .Name }}: {{ .Value }}
{{ end }}{{ end }}"#;

pub const SLACK_FALLBACK_TEMPLATE: &str =
    r#"{{ .CommonLabels.alertname }} ({{ .Status }})"#;

pub const PAGERDUTY_DESCRIPTION_TEMPLATE: &str =
    r#"{{ .CommonLabels.alertname }}: {{ .CommonAnnotations.description }}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amconfig::schema::{AmConfig, DEFAULT_RECEIVER};

    fn info() -> InitInfo {
        InitInfo {
            email: "alerts@example.com".to_string(),
            user: "mailer".to_string(),
            token: "hunter2".to_string(),
            smtp: "localhost".to_string(),
            port: "25".to_string(),
            tls: "true".to_string(),
            resolve_timeout: "3m".to_string(),
        }
    }

    #[test]
    fn test_rendered_default_parses() {
        let rendered = render_default_config(&info()).unwrap();
        let config: AmConfig = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(config.global.smtp_from, "alerts@example.com");
        assert_eq!(config.global.smtp_smarthost, "localhost:25");
        assert_eq!(config.global.smtp_require_tls, Some(true));
        assert!(config.smtp_initialized());
        assert_eq!(config.route.receiver, DEFAULT_RECEIVER);
        assert_eq!(config.receivers.len(), 1);
        assert_eq!(config.receivers[0].name, DEFAULT_RECEIVER);
        assert!(config.route.routes.is_empty());
    }

    #[test]
    fn test_empty_tls_is_omitted() {
        let rendered = render_default_config(&InitInfo {
            tls: String::new(),
            ..info()
        })
        .unwrap();
        assert!(!rendered.contains("smtp_require_tls"));
        let config: AmConfig = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(config.global.smtp_require_tls, None);
    }

    #[test]
    fn test_resolve_timeout_defaults_when_unset() {
        let rendered = render_default_config(&InitInfo {
            resolve_timeout: String::new(),
            ..info()
        })
        .unwrap();
        let config: AmConfig = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(
            config.global.resolve_timeout,
            Some(std::time::Duration::from_secs(300))
        );
    }
}
