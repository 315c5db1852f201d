use crate::model::{decode, ItemId, ItemKind};
use crate::util::{validate_base_url, UrlValidationError};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Public Firebase endpoint for the Hacker News API.
pub const DEFAULT_BASE_URL: &str = "https://hacker-news.firebaseio.com/v0";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ITEM_SIZE: usize = 1024 * 1024; // 1MB, items are a few KB at most
const MAX_LISTING_SIZE: usize = 256 * 1024; // topstories is ~500 ids

/// Errors from a single item request.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
    /// Listing body was not the expected JSON array of ids
    #[error("Invalid listing: {0}")]
    InvalidListing(String),
}

/// Errors building a client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] UrlValidationError),
    #[error("Failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Something that can fetch the raw JSON body of an item.
///
/// The comment pipeline only ever talks to this trait, so tests can drive
/// it with canned payloads and artificial delays instead of a network.
pub trait ItemSource: Send + Sync {
    /// Issue one GET for `id`. No retries.
    fn fetch_item(
        &self,
        id: ItemId,
        kind: ItemKind,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// `reqwest`-backed Hacker News client.
///
/// Cheap to clone: the inner `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct HnClient {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HnClient {
    /// Client for the public API with the default timeout.
    pub fn new() -> Result<Self, ClientError> {
        Self::with_base_url(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Client for a custom base URL (HTTPS, or HTTP on loopback only).
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = validate_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("hnplus/", env!("CARGO_PKG_VERSION")))
            .build()?;

        if base_url.as_str().trim_end_matches('/') != DEFAULT_BASE_URL {
            tracing::info!(base_url = %base_url, "Using custom API base URL");
        }

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the current front-page story ids, best first.
    ///
    /// # Errors
    ///
    /// Any [`FetchError`] from the request, or [`FetchError::InvalidListing`]
    /// when the body is not a JSON array of ids.
    pub async fn top_story_ids(&self) -> Result<Vec<ItemId>, FetchError> {
        let bytes = self.get("topstories.json", MAX_LISTING_SIZE).await?;
        decode::<Vec<ItemId>>(&bytes).map_err(|e| FetchError::InvalidListing(e.to_string()))
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        // Base URL is validated and slash-terminated, and `path` is built
        // from digits and fixed names, so join cannot fail in practice.
        self.base_url
            .join(path)
            .map_err(|e| FetchError::InvalidListing(format!("bad endpoint {path}: {e}")))
    }

    async fn get(&self, path: &str, limit: usize) -> Result<Vec<u8>, FetchError> {
        let url = self.endpoint(path)?;

        let request = async {
            let response = self.http.get(url.clone()).send().await?;

            if !response.status().is_success() {
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            read_limited_bytes(response, limit).await
        };

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }
}

impl ItemSource for HnClient {
    async fn fetch_item(&self, id: ItemId, kind: ItemKind) -> Result<Vec<u8>, FetchError> {
        tracing::trace!(id, %kind, "Fetching item");
        self.get(&format!("item/{id}.json"), MAX_ITEM_SIZE).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
