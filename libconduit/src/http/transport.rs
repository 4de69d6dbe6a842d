//! The wire underneath [`HttpClient`](super::HttpClient)
//!
//! A transport only moves bytes. Status validation and decoding live in the
//! client so every transport gets the same error classification.

use async_trait::async_trait;
use reqwest::Url;
use thiserror::Error;

use crate::error::HttpError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Post => f.write_str("POST"),
        }
    }
}

/// One outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::Get,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: Url, body: Option<Vec<u8>>) -> Self {
        Self {
            method: Method::Post,
            url,
            headers: Vec::new(),
            body,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// What came back from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResponse {
    /// A well-formed HTTP response with a status line
    Http { status: u16, body: Vec<u8> },
    /// Something that is not an HTTP response (e.g. a non-HTTP URL scheme).
    ///
    /// [`ReqwestTransport`] never returns this: reqwest only speaks HTTP and
    /// reports anything else as a [`TransportError`]. It exists for other
    /// transports, and [`MockTransport`](super::mock::MockTransport) can script it.
    NonHttp { description: String, body: Vec<u8> },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connect, TLS, timeout or body-read failure
    #[error("{0}")]
    Session(String),

    /// Anything the transport cannot attribute to the network session
    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for HttpError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Session(message) => HttpError::Session { message },
            TransportError::Other(cause) => HttpError::Other { cause },
        }
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<TransportResponse, TransportError>;

    fn name(&self) -> &str;
}

/// Production transport backed by a shared reqwest client.
///
/// The platform default timeouts apply; no retries.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns `HttpError::Other` when the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("conduit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Other {
                cause: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_transport_error)?;

        Ok(TransportResponse::Http {
            status,
            body: body.to_vec(),
        })
    }

    fn name(&self) -> &str {
        "reqwest"
    }
}

fn map_transport_error(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::Other(error.to_string())
    } else {
        TransportError::Session(error.to_string())
    }
}
