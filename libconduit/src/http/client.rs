//! Typed JSON client with a closed error taxonomy

use std::ops::RangeInclusive;
use std::sync::Arc;

use reqwest::Url;
use serde::de::DeserializeOwned;

use super::transport::{HttpRequest, HttpTransport, ReqwestTransport, TransportResponse};
use crate::error::HttpError;

/// Status codes treated as success.
///
/// The upper bound admits 300. Conduit clients have always accepted it, so
/// it stays even though it is not a 2xx code.
pub const ACCEPTED_STATUS: RangeInclusive<u16> = 200..=300;

/// Turns a response body into a typed value.
///
/// The error string is the decoder's diagnostic and ends up in
/// [`HttpError::BadBody`].
pub trait ResponseDecoder<T> {
    fn decode(&self, body: &[u8]) -> Result<T, String>;
}

/// serde_json decoder. Date fields carry their own format through
/// [`crate::types::conduit_date`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl<T: DeserializeOwned> ResponseDecoder<T> for JsonDecoder {
    fn decode(&self, body: &[u8]) -> Result<T, String> {
        serde_json::from_slice(body).map_err(|e| e.to_string())
    }
}

#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl HttpClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Client over the production reqwest transport
    pub fn reqwest() -> Result<Self, HttpError> {
        Ok(Self::new(Arc::new(ReqwestTransport::new()?)))
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &Url) -> Result<T, HttpError> {
        self.get_with(url, &JsonDecoder).await
    }

    pub async fn get_with<T, D>(&self, url: &Url, decoder: &D) -> Result<T, HttpError>
    where
        D: ResponseDecoder<T> + Sync + ?Sized,
    {
        let body = self.exchange(HttpRequest::get(url.clone())).await?;
        decode_body(decoder, &body)
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        url: &Url,
        body: Option<Vec<u8>>,
    ) -> Result<T, HttpError> {
        self.post_with(url, body, &JsonDecoder).await
    }

    pub async fn post_with<T, D>(
        &self,
        url: &Url,
        body: Option<Vec<u8>>,
        decoder: &D,
    ) -> Result<T, HttpError>
    where
        D: ResponseDecoder<T> + Sync + ?Sized,
    {
        let request = HttpRequest::post(url.clone(), body)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        let body = self.exchange(request).await?;
        decode_body(decoder, &body)
    }

    /// Send one request and return the body of an accepted response
    async fn exchange(&self, request: HttpRequest) -> Result<Vec<u8>, HttpError> {
        let method = request.method;
        let url = request.url.to_string();
        tracing::debug!("{} {}", method, url);

        let outcome = match self.transport.execute(request).await {
            Ok(response) => classify(response),
            Err(e) => Err(HttpError::from(e)),
        };

        if let Err(ref e) = outcome {
            tracing::warn!("{} {} failed: {}", method, url, e);
        }
        outcome
    }
}

/// Map a transport response onto the accepted body or an [`HttpError`]
pub fn classify(response: TransportResponse) -> Result<Vec<u8>, HttpError> {
    match response {
        TransportResponse::NonHttp { description, body } => Err(HttpError::InvalidResponse {
            response: description,
            body,
        }),
        TransportResponse::Http { status, body } if ACCEPTED_STATUS.contains(&status) => Ok(body),
        TransportResponse::Http { status, body } => Err(HttpError::BadStatus { status, body }),
    }
}

fn decode_body<T, D>(decoder: &D, body: &[u8]) -> Result<T, HttpError>
where
    D: ResponseDecoder<T> + ?Sized,
{
    decoder
        .decode(body)
        .map_err(|diagnostic| HttpError::BadBody { diagnostic })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> TransportResponse {
        TransportResponse::Http {
            status,
            body: b"{}".to_vec(),
        }
    }

    #[test]
    fn test_classify_accepts_2xx() {
        assert!(classify(http(200)).is_ok());
        assert!(classify(http(201)).is_ok());
        assert!(classify(http(299)).is_ok());
    }

    #[test]
    fn test_classify_accepts_300_boundary() {
        // 300 is deliberately accepted; see ACCEPTED_STATUS
        assert_eq!(classify(http(300)).unwrap(), b"{}".to_vec());
    }

    #[test]
    fn test_classify_rejects_301_and_below_200() {
        for status in [199, 301, 404, 500] {
            match classify(http(status)) {
                Err(HttpError::BadStatus { status: got, body }) => {
                    assert_eq!(got, status);
                    assert_eq!(body, b"{}".to_vec());
                }
                other => panic!("expected BadStatus for {}, got {:?}", status, other),
            }
        }
    }

    #[test]
    fn test_classify_non_http_response() {
        let response = TransportResponse::NonHttp {
            description: "file:///tmp/feed.json".to_string(),
            body: b"[]".to_vec(),
        };
        assert_eq!(
            classify(response),
            Err(HttpError::InvalidResponse {
                response: "file:///tmp/feed.json".to_string(),
                body: b"[]".to_vec(),
            })
        );
    }

    #[test]
    fn test_decode_failure_is_bad_body() {
        let result: Result<Vec<String>, HttpError> = decode_body(&JsonDecoder, b"{\"not\": \"a list\"}");
        match result {
            Err(HttpError::BadBody { diagnostic }) => assert!(diagnostic.contains("expected a sequence")),
            other => panic!("expected BadBody, got {:?}", other),
        }
    }

    struct Uppercase;

    impl ResponseDecoder<String> for Uppercase {
        fn decode(&self, body: &[u8]) -> Result<String, String> {
            std::str::from_utf8(body)
                .map(str::to_uppercase)
                .map_err(|e| e.to_string())
        }
    }

    #[test]
    fn test_custom_decoder() {
        let decoded = decode_body(&Uppercase, b"conduit").unwrap();
        assert_eq!(decoded, "CONDUIT");
    }
}
