//! The HTTP collaborator.
//!
//! Requests and responses cross this boundary as plain data. Anything that
//! can execute an [`HttpRequest`] and report the outcome asynchronously can
//! stand in for [`ReqwestTransport`], which makes the dispatcher easy to
//! drive from tests.

use std::fmt;

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use reqwest::Client as ReqwestClient;
use thiserror::Error;
use url::Url;

/// A signed request, ready to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

/// What the server answered, whatever the status.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::Timeout => f.write_str("timed out"),
            TransportErrorKind::Connect => f.write_str("connection failed"),
            TransportErrorKind::Other => f.write_str("request failed"),
        }
    }
}

/// A failure below HTTP: no response was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} : {message}")]
pub struct TransportError {
    kind: TransportErrorKind,
    message: String,
}

impl TransportError {
    pub fn new<T: Into<String>>(kind: TransportErrorKind, message: T) -> Self {
        TransportError {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> TransportErrorKind {
        self.kind
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        TransportError::new(kind, err.to_string())
    }
}

/// Sends a request and eventually yields a response or a transport error.
///
/// Non-success statuses are responses, not errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by `reqwest`.
///
/// Timeouts, proxies and TLS are configured on the inner `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    inner: ReqwestClient,
}

impl From<ReqwestClient> for ReqwestTransport {
    fn from(client: ReqwestClient) -> Self {
        ReqwestTransport::new_with_client(client)
    }
}

impl ReqwestTransport {
    /// Constructs a new `ReqwestTransport`.
    ///
    /// This method calls reqwest::Client::new() internally.
    pub fn new() -> Self {
        ReqwestTransport {
            inner: ReqwestClient::new(),
        }
    }

    /// Constructs a new `ReqwestTransport` with specifying inner `reqwest::Client`.
    pub fn new_with_client(client: ReqwestClient) -> Self {
        ReqwestTransport { inner: client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .inner
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        // port 9 (discard) is closed on loopback
        let transport = ReqwestTransport::new();
        let request = HttpRequest {
            method: Method::GET,
            url: Url::parse("http://127.0.0.1:9/").unwrap(),
            headers: HeaderMap::new(),
            body: None,
        };
        let err = transport.send(request).await.unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::Connect);
        assert!(!err.is_timeout());
    }

    #[test]
    fn error_display() {
        let err = TransportError::new(TransportErrorKind::Timeout, "after 5s");
        assert_eq!(err.to_string(), "timed out : after 5s");
        assert!(err.is_timeout());
    }
}
