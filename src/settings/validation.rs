//! Semantic validation of sidecar settings.
//!
//! Serde handles the syntactic layer; these checks catch values that parse
//! but cannot work. All errors are collected and reported together.

use std::net::SocketAddr;

use crate::settings::schema::SidecarSettings;

pub fn validate_settings(settings: &SidecarSettings) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if settings.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(format!(
            "invalid listen address \"{}\"",
            settings.listener.bind_address
        ));
    }
    match url::Url::parse(&settings.upstream.alertmanager_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => errors.push(format!(
            "alertmanager_url \"{}\" is not an http(s) URL",
            settings.upstream.alertmanager_url
        )),
    }
    if settings.upstream.config_file.is_empty() {
        errors.push("config_file must not be empty".to_string());
    }
    if settings.timeouts.request_secs == 0 {
        errors.push("request timeout must be nonzero".to_string());
    }
    if settings.timeouts.upstream_secs == 0 {
        errors.push("upstream timeout must be nonzero".to_string());
    }
    if settings.startup.connect_attempts == 0 {
        errors.push("connect_attempts must be nonzero".to_string());
    }
    if settings.observability.metrics_enabled
        && settings
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(format!(
            "invalid metrics address \"{}\"",
            settings.observability.metrics_address
        ));
    }
    if let Some(tls) = &settings.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push("tls requires both cert_path and key_path".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::schema::TlsSettings;

    #[test]
    fn test_defaults_validate() {
        assert!(validate_settings(&SidecarSettings::default()).is_ok());
    }

    #[test]
    fn test_errors_are_collected() {
        let mut settings = SidecarSettings::default();
        settings.listener.bind_address = "not an address".to_string();
        settings.upstream.alertmanager_url = "ftp://example.com".to_string();
        settings.timeouts.request_secs = 0;
        settings.listener.tls = Some(TlsSettings {
            cert_path: String::new(),
            key_path: String::new(),
        });

        let errors = validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 4);
    }
}
