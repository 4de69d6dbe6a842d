//! Scripted transport for tests
//!
//! Responses are served from a FIFO queue; when the queue is empty the
//! fallback response (if any) is used. Every request is recorded so tests
//! can assert on URLs, headers and bodies.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::transport::{HttpRequest, HttpTransport, TransportError, TransportResponse};

type Scripted = Result<TransportResponse, TransportError>;

#[derive(Clone, Default)]
pub struct MockTransport {
    queue: Arc<Mutex<VecDeque<Scripted>>>,
    fallback: Arc<Mutex<Option<Scripted>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    delay: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer with `status` and `body`
    pub fn respond(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let mock = Self::new();
        mock.set_fallback(Ok(TransportResponse::Http {
            status,
            body: body.into(),
        }));
        mock
    }

    /// Always answer with `status` and a JSON body
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::respond(status, value.to_string())
    }

    /// Always fail at the transport level
    pub fn failing(error: TransportError) -> Self {
        let mock = Self::new();
        mock.set_fallback(Err(error));
        mock
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn enqueue(&self, response: Scripted) {
        lock(&self.queue).push_back(response);
    }

    pub fn set_fallback(&self, response: Scripted) {
        *lock(&self.fallback) = Some(response);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<TransportResponse, TransportError> {
        lock(&self.requests).push(request);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = lock(&self.queue).pop_front();
        match scripted {
            Some(response) => response,
            None => lock(&self.fallback)
                .clone()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted response".to_string()))),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
