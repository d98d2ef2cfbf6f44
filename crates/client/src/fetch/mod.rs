//! Network access for the worker.
//!
//! ### Fetcher
//! - One async method: request in, response or failure out.
//! - Non-2xx statuses are responses, not failures; only transport errors
//!   and oversized bodies fail.
//!
//! ### Origin classification
//! - A response whose final URL shares the configured origin is `basic`.
//! - Anything else is `cors`.
//!
//! ### Limits
//! - Max body bytes: 5MB (configurable)
//! - Timeout: none unless configured

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, header};

use swcache_core::{Error, Request, Response, ResponseType};

pub use self::url::{UrlError, canonicalize, same_origin};

/// Issues a network request on behalf of the worker.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin the worker is serving; decides `basic` vs `cors`.
    pub origin: ::url::Url,

    /// User agent string (default: "swcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,
}

impl FetchConfig {
    pub fn new(origin: ::url::Url) -> Self {
        Self { origin, user_agent: "swcache/0.1".to_string(), max_bytes: 5 * 1024 * 1024, timeout: None }
    }
}

/// reqwest-backed [`Fetcher`].
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn classify(&self, final_url: &::url::Url) -> ResponseType {
        if same_origin(&self.config.origin, final_url) { ResponseType::Basic } else { ResponseType::Cors }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let url = canonicalize(&request.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("method {}: {e}", request.method)))?;

        let response = self
            .http
            .request(method, url.as_str())
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            bytes.len()
        );

        let mut out = Response::new(final_url.as_str(), status.as_u16(), self.classify(&final_url), bytes);
        if let Some(reason) = status.canonical_reason() {
            out = out.with_status_text(reason);
        }
        for (name, value) in headers.iter() {
            if name == header::SET_COOKIE {
                continue;
            }
            if let Ok(value) = value.to_str() {
                out = out.with_header(name.as_str(), value);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> ::url::Url {
        ::url::Url::parse("https://user.github.io/").unwrap()
    }

    #[test]
    fn test_fetch_config_defaults() {
        let config = FetchConfig::new(origin());
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert!(config.timeout.is_none());
    }

    #[tokio::test]
    async fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::new(origin()));
        assert!(fetcher.is_ok());

        let with_timeout = HttpFetcher::new(FetchConfig { timeout: Some(Duration::from_secs(5)), ..FetchConfig::new(origin()) });
        assert!(with_timeout.is_ok());
    }

    #[tokio::test]
    async fn test_classify_by_origin() {
        let fetcher = HttpFetcher::new(FetchConfig::new(origin())).unwrap();
        let same = ::url::Url::parse("https://user.github.io/github_pages_index/").unwrap();
        let cross = ::url::Url::parse("https://fonts.example.net/font.woff2").unwrap();
        assert_eq!(fetcher.classify(&same), ResponseType::Basic);
        assert_eq!(fetcher.classify(&cross), ResponseType::Cors);
    }

    #[tokio::test]
    async fn test_fetch_rejects_relative_url() {
        let fetcher = HttpFetcher::new(FetchConfig::new(origin())).unwrap();
        let result = fetcher.fetch(&Request::get("/github_pages_index/")).await;
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_network_error() {
        let fetcher = HttpFetcher::new(FetchConfig::new(origin())).unwrap();
        // Port 9 on loopback (discard) is closed on any sane test machine.
        let result = fetcher.fetch(&Request::get("http://127.0.0.1:9/")).await;
        assert!(matches!(result, Err(Error::Network(_))));
    }
}
