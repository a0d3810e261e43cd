//! Requests, responses and the network seam of the worker.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};

use crate::error::Result;

/// Header carrying the time an API response entered the cache.
pub const CACHED_AT_HEADER: &str = "sw-cached-at";

/// A request seen by the worker.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl WorkerRequest {
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Whether this request may be answered from a cache.
    #[must_use]
    pub fn is_cacheable_method(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Whether the client asked for an HTML document.
    #[must_use]
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }
}

/// A response produced by the network, a cache or the worker itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl WorkerResponse {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// A JSON response.
    #[must_use]
    pub fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(value.to_string())
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Value of a header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// When this response was put into the API cache.
    #[must_use]
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.header(CACHED_AT_HEADER)?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// Returns a copy stamped with `now` as its cache time.
    #[must_use]
    pub fn stamped(&self, now: DateTime<Utc>) -> Self {
        let mut stamped = self.clone();
        if let Ok(value) = HeaderValue::from_str(&now.to_rfc3339()) {
            stamped
                .headers
                .insert(HeaderName::from_static(CACHED_AT_HEADER), value);
        }
        stamped
    }
}

/// Performs network requests on behalf of the worker.
///
/// Abstracted so routing can be tested without a network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Sends `request` and reads the full response.
    ///
    /// Non-2xx statuses are responses, not errors; only transport failures
    /// return `Err`.
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse>;
}

/// Headers that describe one hop and must not be forwarded.
const HOP_BY_HOP: [&str; 6] = [
    "connection",
    "host",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// `reqwest` implementation of [`Fetcher`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    #[must_use]
    pub const fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse> {
        let mut headers = request.headers.clone();
        for name in HOP_BY_HOP {
            headers.remove(name);
        }
        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status();
        let mut headers = response.headers().clone();
        for name in HOP_BY_HOP {
            headers.remove(name);
        }
        let body = response.bytes().await?;
        Ok(WorkerResponse {
            status,
            headers,
            body,
        })
    }
}
