//! Crate-wide error taxonomy.
//!
//! # Design Decisions
//! - Validation failures are resolved locally and never reach the network
//! - Upstream failures keep the status and body so callers can tell a
//!   client mistake from a backend outage
//! - Everything maps onto an HTTP status for the sidecar API via
//!   `IntoResponse`

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Receiver rejected before any network call.
    #[error("invalid receiver: {0}")]
    InvalidReceiver(String),

    /// Duplicate composite receiver name on create.
    #[error("receiver \"{0}\" already exists, delete it first")]
    AlreadyExists(String),

    /// Delete or lookup of an unknown receiver.
    #[error("{0}")]
    ReceiverNotFound(String),

    /// Peer never became reachable within the bounded startup retries.
    #[error("unable to reach {addr}: {message}")]
    Connectivity { addr: String, message: String },

    /// Secret store did not yield SMTP credentials. Fatal to construction.
    #[error("failed to fetch credentials: {0}")]
    Credentials(String),

    /// Upstream answered with a non-2xx status.
    #[error("bad response status {status}: {message}")]
    UpstreamStatus { status: StatusCode, message: String },

    #[error("config file {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("wire decode error: {0}")]
    WireParse(#[from] serde_json::Error),

    #[error("config template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// HTTP status the sidecar surfaces for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::InvalidReceiver(_) => StatusCode::BAD_REQUEST,
            Error::AlreadyExists(_) => StatusCode::CONFLICT,
            Error::ReceiverNotFound(_) => StatusCode::NOT_FOUND,
            Error::UpstreamStatus { status, .. } => *status,
            Error::Connectivity { .. } | Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
