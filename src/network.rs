use crate::cache::{CacheKind, CacheStore};
use crate::error::FetchError;
use crate::options::Cli;
use base64::Engine;
use flate2::read::GzDecoder;
use reqwest::StatusCode;
use std::error::Error;
use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

/// Builds and configures the HTTP client based on the provided CLI options.
///
/// Timeouts and redirects are left at reqwest's defaults.
pub fn build_client(options: &Cli) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut client_builder = reqwest::Client::builder().user_agent(options.user_agent.as_str());

    if let Some(auth) = &options.basic_auth {
        if !auth.is_empty() {
            let mut headers = reqwest::header::HeaderMap::new();
            let encoded_credentials =
                base64::engine::general_purpose::STANDARD.encode(auth.as_bytes());
            let auth_value = format!("Basic {}", encoded_credentials).parse()?;
            headers.insert(reqwest::header::AUTHORIZATION, auth_value);
            client_builder = client_builder.default_headers(headers);
        }
    }
    Ok(client_builder.build()?)
}

/// Returns `true` if the body starts with the gzip magic bytes.
///
/// The URL suffix is not trusted: servers often serve `sitemap.xml.gz`
/// already inflated.
pub fn is_gzip_content(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x1f, 0x8b])
}

/// Inflates a gzip compressed body into text.
pub fn decompress_gzip(bytes: &[u8]) -> std::io::Result<String> {
    let mut decoder = GzDecoder::new(bytes);
    let mut content = String::new();
    decoder.read_to_string(&mut content)?;
    Ok(content)
}

/// Retrieves documents over HTTP, optionally memoized by a [`CacheStore`]
/// and bounded to a number of simultaneous requests.
#[derive(Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    cache: Option<CacheStore>,
    limiter: Option<Semaphore>,
    requests: AtomicUsize,
}

impl Fetcher {
    /// `concurrency_limit` of `None` leaves the number of in-flight requests
    /// unbounded.
    pub fn new(
        client: reqwest::Client,
        cache: Option<CacheStore>,
        concurrency_limit: Option<usize>,
    ) -> Self {
        Self {
            client,
            cache,
            limiter: concurrency_limit.map(|n| Semaphore::new(n.max(1))),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn cache(&self) -> Option<&CacheStore> {
        self.cache.as_ref()
    }

    /// Number of requests that actually went out to the network.
    pub fn requests_issued(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Fetches the body of `url` as text.
    ///
    /// A cached body is returned without touching the network. Otherwise a
    /// single GET is issued; anything but `200 OK` is an error and nothing is
    /// retried. Gzip bodies are inflated before being returned and cached.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Request`] if the request could not be sent or the body
    ///   could not be read.
    /// - [`FetchError::Status`] for any status other than 200.
    /// - [`FetchError::Decompress`] if a gzip body is corrupt.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Some(cache) = &self.cache {
            if let Some(content) = cache.get(CacheKind::Document, url).await {
                return Ok(content);
            }
        }

        let content = self.fetch_live(url).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(CacheKind::Document, url, &content).await {
                tracing::warn!(url, error = %e, "failed to write document to cache");
            }
        }
        Ok(content)
    }

    async fn fetch_live(&self, url: &str) -> Result<String, FetchError> {
        // The permit covers the request only, never the caller's recursion.
        let _permit = match &self.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };

        self.requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(url, "GET");

        let request_error = |source: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            source,
        };
        let response = self.client.get(url).send().await.map_err(request_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let bytes = response.bytes().await.map_err(request_error)?;
        if is_gzip_content(&bytes) {
            decompress_gzip(&bytes).map_err(|source| FetchError::Decompress {
                url: url.to_string(),
                source,
            })
        } else {
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}
