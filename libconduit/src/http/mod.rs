//! HTTP access to the Conduit API
//!
//! - [`HttpClient`]: GET/POST with status validation and JSON decoding
//! - [`HttpTransport`]: the byte-moving seam ([`ReqwestTransport`] in production)
//! - [`mock::MockTransport`]: scripted responses for tests

pub mod client;
pub mod mock;
pub mod transport;

pub use client::{classify, HttpClient, JsonDecoder, ResponseDecoder, ACCEPTED_STATUS};
pub use transport::{
    HttpRequest, HttpTransport, Method, ReqwestTransport, TransportError, TransportResponse,
};
