//! Pass-through proxying to the routing engine.
//!
//! # Responsibilities
//! - Rewrite scheme/authority (and the Host header) of inbound requests
//! - Forward body and remaining headers verbatim
//! - Stream the upstream response back untouched
//!
//! No retries, no caching, no transformation; upstream failures surface as
//! whatever the upstream returned, or 502 when it was unreachable.

use std::str::FromStr;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::error::{Error, Result};
use crate::observability::metrics;

#[derive(Clone)]
pub struct ReverseProxy {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
}

impl ReverseProxy {
    pub fn new(upstream: &url::Url) -> Result<Self> {
        let scheme = Scheme::try_from(upstream.scheme())
            .map_err(|_| Error::Internal(format!("unsupported upstream scheme in {upstream}")))?;
        let host = upstream
            .host_str()
            .ok_or_else(|| Error::Internal(format!("upstream url {upstream} has no host")))?;
        let authority = match upstream.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let authority = Authority::from_str(&authority)
            .map_err(|err| Error::Internal(format!("bad upstream authority: {err}")))?;
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            client,
            scheme,
            authority,
        })
    }

    /// Forward one request. Never fails the handler; errors become a 502.
    pub async fn forward(&self, mut request: Request<Body>) -> Response<Body> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut parts = request.uri().clone().into_parts();
        parts.scheme = Some(self.scheme.clone());
        parts.authority = Some(self.authority.clone());
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        match Uri::from_parts(parts) {
            Ok(uri) => *request.uri_mut() = uri,
            Err(err) => {
                tracing::error!(%method, path = %path, error = %err, "failed to rewrite upstream uri");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, "bad upstream uri");
            }
        }
        // upstream should see itself as the host
        if let Ok(host) = header::HeaderValue::from_str(self.authority.as_str()) {
            request.headers_mut().insert(header::HOST, host);
        }

        match self.client.request(request).await {
            Ok(response) => {
                metrics::record_proxy_request(&method, response.status().as_u16());
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(err) => {
                tracing::error!(%method, path = %path, error = %err, "upstream request failed");
                metrics::record_proxy_request(&method, StatusCode::BAD_GATEWAY.as_u16());
                error_response(
                    StatusCode::BAD_GATEWAY,
                    &format!("upstream request failed: {err}"),
                )
            }
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    let mut response = Response::new(Body::from(message.to_string()));
    *response.status_mut() = status;
    response
}
