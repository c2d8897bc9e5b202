//! HTTP client for the Brigade backend
//!
//! A thin wrapper over `reqwest` pinned to a single base URL. The client
//! attaches the JSON content type on every request, attaches a bearer
//! token when the session has one, enforces the connect and request
//! deadlines, and translates failures into [`HttpError`]. It never
//! retries: retry policy lives in the sync scheduler, and a request that
//! fails here fails exactly once.

use std::sync::Arc;
use std::time::Duration;

use brigade_core::TokenProvider;
use brigade_domain::constants::{CONNECT_TIMEOUT_SECS, REQUEST_TIMEOUT_SECS};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use super::error::HttpError;

/// Configuration for the backend HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL every request path is appended to.
    pub base_url: String,
    /// Deadline for establishing a connection.
    pub connect_timeout: Duration,
    /// Deadline for the whole exchange, connect included.
    pub request_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.brigadepos.com/v1".to_string(),
            connect_timeout: Duration::from_secs(CONNECT_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for backend sync calls.
pub struct HttpClient {
    client: ReqwestClient,
    config: HttpClientConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Create a client from explicit configuration.
    pub fn new(
        config: HttpClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, HttpError> {
        Url::parse(&config.base_url).map_err(|err| {
            HttpError::Config(format!("invalid base url {:?}: {err}", config.base_url))
        })?;

        let client = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("brigade/", env!("CARGO_PKG_VERSION")))
            .no_proxy()
            .build()
            .map_err(|err| HttpError::Config(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    /// GET `path` and decode the JSON response.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let response = self.send(Method::GET, path, None).await?;
        Self::decode(response).await
    }

    /// POST a JSON body to `path` and decode the JSON response.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, HttpError> {
        let body = serde_json::to_value(body).map_err(|err| HttpError::Decode {
            message: format!("request body: {err}"),
        })?;
        let response = self.send(Method::POST, path, Some(body)).await?;
        Self::decode(response).await
    }

    /// Probe the backend with its own, typically much shorter, deadline.
    ///
    /// Any HTTP response proves reachability, so the result only errors on
    /// transport-level failure. `Ok(false)` means reachable but unhealthy.
    pub async fn health_check(&self, path: &str, timeout: Duration) -> Result<bool, HttpError> {
        match tokio::time::timeout(timeout, self.dispatch(Method::GET, path, None)).await {
            Ok(Ok(response)) => Ok(response.status().is_success()),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(HttpError::Timeout { timeout }),
        }
    }

    /// Send a request and reject non-success statuses.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, HttpError> {
        let response = self.dispatch(method, path, body).await?;
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &url, &body));
        }
        Ok(response)
    }

    /// Build and send a request without judging the response status.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, HttpError> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!(%method, %url, "sending HTTP request");

        let mut request = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");

        // Read the token on every call so a session refresh between
        // requests takes effect. An absent or empty token means the
        // request goes out anonymous; an empty bearer is never sent.
        if let Some(token) = self.bearer_token().await {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| self.classify_send_error(err))?;
        debug!(%url, status = %response.status(), "received HTTP response");
        Ok(response)
    }

    async fn bearer_token(&self) -> Option<String> {
        self.tokens
            .bearer_token()
            .await
            .filter(|token| !token.is_empty())
    }

    fn classify_send_error(&self, err: reqwest::Error) -> HttpError {
        if err.is_timeout() {
            HttpError::Timeout {
                timeout: self.config.request_timeout,
            }
        } else {
            HttpError::Transport { source: err }
        }
    }

    fn status_error(status: StatusCode, url: &str, body: &str) -> HttpError {
        let message = if body.is_empty() {
            format!("{url} returned status {status}")
        } else {
            format!("{url} returned status {status}: {body}")
        };
        HttpError::Status { status, message }
    }

    /// Decode a response body, tolerating empty 204/205 answers.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HttpError> {
        let status = response.status();
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return serde_json::from_value(Value::Null).map_err(|_| HttpError::Decode {
                message: format!("no-content response ({status}) for a type expecting a body"),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| HttpError::Transport { source })?;
        serde_json::from_slice(&bytes).map_err(|err| HttpError::Decode {
            message: format!("response body: {err}"),
        })
    }
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    config: HttpClientConfig,
    tokens: Option<Arc<dyn TokenProvider>>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            config: HttpClientConfig::default(),
            tokens: None,
        }
    }
}

impl HttpClientBuilder {
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn token_provider(mut self, tokens: Arc<dyn TokenProvider>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn build(self) -> Result<HttpClient, HttpError> {
        let tokens = self
            .tokens
            .ok_or_else(|| HttpError::Config("token provider is required".to_string()))?;
        HttpClient::new(self.config, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SessionTokens;
    use brigade_domain::ErrorClass;
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestPayload {
        name: String,
        #[serde(default)]
        seats: u32,
    }

    fn client_for(server: &MockServer, token: Option<&str>) -> (HttpClient, Arc<SessionTokens>) {
        let session = Arc::new(SessionTokens::new(token.map(str::to_string)));
        let client = HttpClient::builder()
            .base_url(server.uri())
            .connect_timeout(Duration::from_millis(500))
            .request_timeout(Duration::from_millis(500))
            .token_provider(session.clone())
            .build()
            .unwrap();
        (client, session)
    }

    #[tokio::test]
    async fn test_get_sends_json_and_bearer_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tables/1"))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("Content-Type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"name": "patio", "seats": 4})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, Some("test-token"));
        let payload: TestPayload = client.get("/tables/1").await.unwrap();
        assert_eq!(
            payload,
            TestPayload {
                name: "patio".to_string(),
                seats: 4
            }
        );
    }

    #[tokio::test]
    async fn test_decoding_is_lenient() {
        let server = MockServer::start().await;
        // Unknown fields are ignored, missing optional fields default.
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "bar",
                "unknown_field": {"nested": true}
            })))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, None);
        let payload: TestPayload = client.get("/tables/2").await.unwrap();
        assert_eq!(payload.seats, 0);
    }

    #[tokio::test]
    async fn test_anonymous_request_omits_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "x"})))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, None);
        let _: TestPayload = client.get("/tables/3").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(!requests[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_empty_token_is_never_sent_as_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "x"})))
            .mount(&server)
            .await;

        let (client, session) = client_for(&server, Some(""));
        let _: TestPayload = client.get("/tables/4").await.unwrap();
        session.set_token("");
        let _: TestPayload = client.get("/tables/4").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert!(requests
            .iter()
            .all(|request| !request.headers.contains_key("authorization")));
    }

    #[tokio::test]
    async fn test_token_is_read_fresh_per_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "x"})))
            .mount(&server)
            .await;

        let (client, session) = client_for(&server, Some("first"));
        let _: TestPayload = client.get("/tables/5").await.unwrap();
        session.set_token("second");
        let _: TestPayload = client.get("/tables/5").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let bearer = |i: usize| {
            requests[i]
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .unwrap()
                .to_string()
        };
        assert_eq!(bearer(0), "Bearer first");
        assert_eq!(bearer(1), "Bearer second");
    }

    #[tokio::test]
    async fn test_post_sends_body_and_decodes_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/orders"))
            .and(body_json(json!({"table": 9})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "order-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, Some("test-token"));
        let payload: TestPayload = client.post("/orders", &json!({"table": 9})).await.unwrap();
        assert_eq!(payload.name, "order-9");
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, None);
        let err = client.get::<TestPayload>("/tables").await.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_client_error_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, None);
        let err = client.get::<TestPayload>("/missing").await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::Permanent);
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, None);
        let err = client.get::<TestPayload>("/tables").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"name": "late"}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, None);
        let err = client.get::<TestPayload>("/tables").await.unwrap_err();
        assert!(matches!(err, HttpError::Timeout { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // Bind a port, then drop the listener so connections are refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let session = Arc::new(SessionTokens::new(None));
        let client = HttpClient::builder()
            .base_url(format!("http://{addr}"))
            .request_timeout(Duration::from_millis(500))
            .token_provider(session)
            .build()
            .unwrap();

        let err = client.get::<TestPayload>("/tables").await.unwrap_err();
        assert!(matches!(err, HttpError::Transport { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, None);
        let err = client.get::<TestPayload>("/tables").await.unwrap_err();
        assert!(matches!(err, HttpError::Decode { .. }));
        assert_eq!(err.class(), ErrorClass::Permanent);
    }

    #[tokio::test]
    async fn test_health_check_reports_reachability() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let (client, _) = client_for(&server, None);
        let healthy = client
            .health_check("/health", Duration::from_millis(500))
            .await
            .unwrap();
        assert!(healthy);
    }

    #[tokio::test]
    async fn test_invalid_base_url_is_rejected() {
        let session = Arc::new(SessionTokens::new(None));
        let result = HttpClient::builder()
            .base_url("not a url")
            .token_provider(session)
            .build();
        assert!(matches!(result, Err(HttpError::Config(_))));
    }
}
