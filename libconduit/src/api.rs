//! Conduit REST endpoints used by the feature reducers

use reqwest::Url;

use crate::config::ApiConfig;
use crate::error::{ConfigError, HttpError};
use crate::http::HttpClient;
use crate::types::{Article, ArticlesEnvelope, LoginRequest, User};

#[derive(Debug, Clone)]
pub struct ConduitApi {
    client: HttpClient,
    base_url: Url,
}

impl ConduitApi {
    pub fn new(client: HttpClient, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn from_config(client: HttpClient, config: &ApiConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(client, config.parsed_base_url()?))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `path` below the base URL, keeping any path prefix the base has
    pub fn endpoint(&self, path: &str) -> Result<Url, HttpError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Other {
                cause: format!("invalid endpoint '{}': {}", path, e),
            })
    }

    /// `GET /api/articles`
    pub async fn fetch_feed(&self) -> Result<Vec<Article>, HttpError> {
        let url = self.endpoint("/api/articles")?;
        let envelope: ArticlesEnvelope = self.client.get(&url).await?;
        tracing::debug!("fetched {} articles", envelope.articles.len());
        Ok(envelope.articles)
    }

    /// `POST /api/users/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<User, HttpError> {
        let url = self.endpoint("/api/users/login")?;
        let body = serde_json::to_vec(&LoginRequest::new(email, password)).map_err(|e| {
            HttpError::Other {
                cause: format!("failed to encode login request: {}", e),
            }
        })?;
        self.client.post(&url, Some(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockTransport;
    use std::sync::Arc;

    fn api(base: &str, transport: MockTransport) -> ConduitApi {
        ConduitApi::new(
            HttpClient::new(Arc::new(transport)),
            Url::parse(base).unwrap(),
        )
    }

    #[test]
    fn test_endpoint_without_prefix() {
        let api = api("https://conduit.productionready.io", MockTransport::new());
        assert_eq!(
            api.endpoint("/api/articles").unwrap().as_str(),
            "https://conduit.productionready.io/api/articles"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_prefix() {
        let api = api("http://localhost:3000/v1", MockTransport::new());
        assert_eq!(
            api.endpoint("/api/users/login").unwrap().as_str(),
            "http://localhost:3000/v1/api/users/login"
        );
    }

    #[tokio::test]
    async fn test_login_posts_json_envelope() {
        let transport = MockTransport::json(
            200,
            &serde_json::json!({"user": {"token": "jwt", "username": "jake", "image": null}}),
        );
        let api = api("https://conduit.test", transport.clone());

        let user = api.login("jake@jake.jake", "jakejake").await.unwrap();
        assert_eq!(user, User::new("jwt", "jake", None));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.url.as_str(), "https://conduit.test/api/users/login");
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));
        assert_eq!(request.header_value("Accept"), Some("application/json"));

        let body: serde_json::Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"user": {"email": "jake@jake.jake", "password": "jakejake"}})
        );
    }

    #[tokio::test]
    async fn test_fetch_feed_unwraps_envelope() {
        let transport = MockTransport::json(
            200,
            &serde_json::json!({"articles": [], "articlesCount": 0}),
        );
        let api = api("https://conduit.test", transport.clone());

        let articles = api.fetch_feed().await.unwrap();
        assert!(articles.is_empty());
        assert_eq!(transport.requests()[0].url.as_str(), "https://conduit.test/api/articles");
        assert_eq!(transport.requests()[0].body, None);
    }
}
