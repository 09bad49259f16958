//! HTTP fetch used by the strategies.
//!
//! The [`Fetch`] trait is the engine's only network seam. Unlike a plain
//! HTTP client, `get` resolves with the response whatever its status;
//! only connection-level failures (DNS, refused, timeout) surface as
//! errors, because those are exactly what the strategies recover from.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header, header::HeaderMap};
use url::Url;

use overcast_core::{AppConfig, Error};

use crate::request::EngineRequest;

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "overcast/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "overcast/0.1".to_string(), timeout: Duration::from_millis(20_000), max_redirects: 5 }
    }
}

impl FetchConfig {
    /// Derive the fetch settings from the engine configuration.
    pub fn from_app(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body bytes
    pub bytes: Bytes,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Clone this response into a storable entry for `store`. The live
    /// body stays with the caller; the store gets its own copy.
    pub(crate) fn to_stored(&self, store: &str, method: &str) -> overcast_core::StoredResponse {
        overcast_core::StoredResponse::new(
            store,
            method,
            self.url.as_str(),
            self.status.as_u16(),
            self.content_type.clone(),
            crate::request::headers_to_json(&self.headers),
            self.bytes.to_vec(),
        )
    }
}

/// The engine's network seam.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET a URL. Non-2xx statuses are ordinary responses here.
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error>;

    /// Forward a request unmodified (the bypass path).
    async fn forward(&self, request: &EngineRequest) -> Result<FetchResponse, Error>;
}

/// Real HTTP fetcher backed by reqwest.
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }

    async fn read_response(url: &Url, response: reqwest::Response, start: Instant) -> Result<FetchResponse, Error> {
        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response body: {e}")))?;

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms,
            "fetched"
        );

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, headers, bytes, fetch_ms })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        Self::read_response(url, response, start).await
    }

    async fn forward(&self, request: &EngineRequest) -> Result<FetchResponse, Error> {
        let start = Instant::now();
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| Error::Network(e.to_string()))?;

        Self::read_response(&request.url, response, start).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "overcast/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20_000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig { user_agent: "petapp/2.0".into(), timeout_ms: 5_000, ..Default::default() };
        let config = FetchConfig::from_app(&app);
        assert_eq!(config.user_agent, "petapp/2.0");
        assert_eq!(config.timeout, Duration::from_millis(5_000));
    }

    #[test]
    fn test_fetcher_builds() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }

    #[test]
    fn test_to_stored_copies_body() {
        let response = FetchResponse {
            url: Url::parse("https://example.com/app.js").unwrap(),
            final_url: Url::parse("https://example.com/app.js").unwrap(),
            status: StatusCode::OK,
            content_type: Some("text/javascript".to_string()),
            headers: HeaderMap::new(),
            bytes: Bytes::from_static(b"console.log(1)"),
            fetch_ms: 3,
        };

        let entry = response.to_stored("app-dynamic-v1", "GET");
        assert_eq!(entry.store, "app-dynamic-v1");
        assert_eq!(entry.status, 200);
        assert_eq!(entry.body, b"console.log(1)");
        // Live body untouched.
        assert_eq!(response.bytes, Bytes::from_static(b"console.log(1)"));
    }
}
