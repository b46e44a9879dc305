//! Authenticated HTTP client builder with a shared concurrency limit.

use std::sync::Arc;
use std::time::Duration;

use log::*;
use reqwest::header::HeaderMap;
use reqwest::{IntoUrl, RequestBuilder, Response, StatusCode};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::api_key::ProviderAuth;
use crate::error::{http_error, Error, HttpErrorKind};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum number of requests in flight when no shared limiter is supplied.
    pub max_concurrent_requests: usize,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_concurrent_requests: 16,
            user_agent: format!("audiototext/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a limiter that several clients can share to bound the total number of
/// outbound requests across providers.
pub fn shared_limiter(max_concurrent_requests: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(max_concurrent_requests.max(1)))
}

/// HTTP client that authenticates every request and holds a limiter permit until
/// the response body has been read.
#[derive(Clone)]
pub struct AuthenticatedClient {
    client: reqwest::Client,
    auth: Option<Arc<dyn ProviderAuth>>,
    limiter: Arc<Semaphore>,
}

impl AuthenticatedClient {
    pub fn get<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.authenticate(self.client.get(url))
    }

    pub fn post<U: IntoUrl>(&self, url: U) -> RequestBuilder {
        self.authenticate(self.client.post(url))
    }

    /// Send a request once the limiter grants a permit.
    ///
    /// The permit travels with the response and is released once the body is read
    /// or the response is dropped.
    pub async fn send(&self, request: RequestBuilder) -> Result<LimitedResponse, Error> {
        let permit = self.limiter.clone().acquire_owned().await.map_err(|_| {
            http_error(HttpErrorKind::LimiterClosed, "request limiter was closed")
        })?;
        let response = request.send().await.map_err(|e| {
            warn!("HTTP request failed: {:?}", e);
            Error::from(e)
        })?;
        debug!("{} {}", response.status(), response.url().path());
        Ok(LimitedResponse {
            response,
            _permit: permit,
        })
    }

    /// Permits currently free on the limiter.
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            Some(auth) => auth.authenticate(request),
            None => request,
        }
    }
}

/// A response that still counts against the limiter.
pub struct LimitedResponse {
    response: Response,
    _permit: OwnedSemaphorePermit,
}

impl LimitedResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Read the whole body, then give the permit back.
    pub async fn text(self) -> Result<String, Error> {
        Ok(self.response.text().await?)
    }
}

/// Builder for creating authenticated HTTP clients.
///
/// Provides a fluent API for constructing HTTP clients with:
/// - Authentication (API keys, bearer tokens)
/// - A concurrency limit, optionally shared with other clients
/// - Timeout configuration
pub struct AuthenticatedClientBuilder {
    config: HttpClientConfig,
    auth: Option<Arc<dyn ProviderAuth>>,
    limiter: Option<Arc<Semaphore>>,
}

impl AuthenticatedClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
            auth: None,
            limiter: None,
        }
    }

    /// Set the authentication provider.
    pub fn with_auth(mut self, auth: Arc<dyn ProviderAuth>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the concurrency limit used when no shared limiter is given.
    pub fn with_max_concurrent_requests(mut self, max_concurrent_requests: usize) -> Self {
        self.config.max_concurrent_requests = max_concurrent_requests;
        self
    }

    /// Share a limiter with other clients instead of creating a private one.
    pub fn with_shared_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<AuthenticatedClient, Error> {
        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent)
            .build()?;

        let limiter = self
            .limiter
            .unwrap_or_else(|| shared_limiter(self.config.max_concurrent_requests));

        Ok(AuthenticatedClient {
            client,
            auth: self.auth,
            limiter,
        })
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_key::{for_provider, ApiKeyProvider};
    use secrecy::SecretString;

    #[test]
    fn test_builder_default() {
        let builder = AuthenticatedClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(30));
        assert_eq!(builder.config.max_concurrent_requests, 16);
    }

    #[test]
    fn test_builder_with_timeout() {
        let builder = AuthenticatedClientBuilder::new().with_timeout(Duration::from_secs(60));
        assert_eq!(builder.config.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_build_client() {
        let client = AuthenticatedClientBuilder::new()
            .with_max_concurrent_requests(4)
            .build()
            .unwrap();
        assert_eq!(client.available_permits(), 4);
    }

    #[tokio::test]
    async fn test_clients_share_one_limiter() {
        let limiter = shared_limiter(2);
        let a = AuthenticatedClientBuilder::new()
            .with_shared_limiter(limiter.clone())
            .build()
            .unwrap();
        let b = AuthenticatedClientBuilder::new()
            .with_shared_limiter(limiter.clone())
            .build()
            .unwrap();

        let _held = limiter.acquire().await.unwrap();
        assert_eq!(a.available_permits(), 1);
        assert_eq!(b.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_send_applies_auth_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header("authorization", "key-1")
            .with_status(200)
            .with_body("pong")
            .create_async()
            .await;

        let auth = for_provider(
            ApiKeyProvider::AssemblyAi,
            SecretString::new("key-1".to_string()),
        )
        .unwrap();
        let client = AuthenticatedClientBuilder::new()
            .with_auth(auth)
            .build()
            .unwrap();

        let response = client
            .send(client.get(format!("{}/ping", server.url())))
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_permit_is_held_until_body_is_read() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/transcript/t-1")
            .with_status(200)
            .with_body(r#"{"status":"completed"}"#)
            .create_async()
            .await;

        let client = AuthenticatedClientBuilder::new()
            .with_shared_limiter(shared_limiter(2))
            .build()
            .unwrap();

        let response = client
            .send(client.get(format!("{}/transcript/t-1", server.url())))
            .await
            .unwrap();
        assert_eq!(client.available_permits(), 1);

        let body = response.text().await.unwrap();
        assert_eq!(body, r#"{"status":"completed"}"#);
        assert_eq!(client.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_dropped_response_releases_permit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/models")
            .with_status(401)
            .create_async()
            .await;

        let client = AuthenticatedClientBuilder::new()
            .with_shared_limiter(shared_limiter(1))
            .build()
            .unwrap();

        let response = client
            .send(client.get(format!("{}/models", server.url())))
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
        drop(response);
        assert_eq!(client.available_permits(), 1);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        assert_eq!(shared_limiter(0).available_permits(), 1);
    }
}
