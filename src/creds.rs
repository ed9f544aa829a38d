//! Credential sourcing for the SMTP bootstrap.
//!
//! Production deployments fetch the account from a secret store; the trait
//! is the seam. A fetch failure is fatal to manager construction and is not
//! retried.

use std::time::Duration;

use async_trait::async_trait;

use crate::amconfig::InitInfo;
use crate::error::{Error, Result};

/// SMTP account the routing engine uses to send notification email.
#[derive(Debug, Clone, Default)]
pub struct SmtpCredentials {
    pub email: String,
    pub user: String,
    pub token: String,
    pub smtp_host: String,
    pub smtp_port: String,
    /// None leaves the routing engine's own TLS default in place.
    pub require_tls: Option<bool>,
}

impl SmtpCredentials {
    pub fn into_init_info(self, resolve_timeout: Duration) -> InitInfo {
        InitInfo {
            email: self.email,
            user: self.user,
            token: self.token,
            smtp: self.smtp_host,
            port: self.smtp_port,
            tls: self.require_tls.map(|t| t.to_string()).unwrap_or_default(),
            resolve_timeout: humantime::format_duration(resolve_timeout).to_string(),
        }
    }
}

#[async_trait]
pub trait CredentialsSource: Send + Sync {
    async fn smtp_credentials(&self) -> Result<SmtpCredentials>;
}

/// Fixed credentials, for tests and deployments that inject the account
/// through configuration.
pub struct StaticCredentials(pub SmtpCredentials);

#[async_trait]
impl CredentialsSource for StaticCredentials {
    async fn smtp_credentials(&self) -> Result<SmtpCredentials> {
        Ok(self.0.clone())
    }
}

/// Reads the account from `ALERTMGR_SMTP_*` environment variables.
pub struct EnvCredentials;

impl EnvCredentials {
    fn required(name: &str) -> Result<String> {
        std::env::var(name).map_err(|_| Error::Credentials(format!("{name} is not set")))
    }
}

#[async_trait]
impl CredentialsSource for EnvCredentials {
    async fn smtp_credentials(&self) -> Result<SmtpCredentials> {
        Ok(SmtpCredentials {
            email: Self::required("ALERTMGR_SMTP_EMAIL")?,
            user: Self::required("ALERTMGR_SMTP_USER")?,
            token: Self::required("ALERTMGR_SMTP_TOKEN")?,
            smtp_host: Self::required("ALERTMGR_SMTP_HOST")?,
            smtp_port: std::env::var("ALERTMGR_SMTP_PORT").unwrap_or_else(|_| "587".to_string()),
            require_tls: std::env::var("ALERTMGR_SMTP_TLS")
                .ok()
                .and_then(|v| v.parse().ok()),
        })
    }
}
