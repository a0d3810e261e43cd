//! Request classification.

use reqwest::Url;

/// How the worker treats a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Cross-origin asset from a known CDN: cache first.
    CdnAsset,
    /// Any other cross-origin request: straight to the network.
    Passthrough,
    /// Same-origin `/api/*`: network first.
    Api,
    /// Same-origin page or asset: cache first.
    Static,
}

/// Classifies `url` relative to the worker's `origin`.
#[must_use]
pub fn classify(url: &Url, origin: &Url, cdn_hosts: &[String]) -> Route {
    if url.origin() != origin.origin() {
        return match url.host_str() {
            Some(host) if cdn_hosts.iter().any(|h| h == host) => Route::CdnAsset,
            _ => Route::Passthrough,
        };
    }
    if url.path().starts_with("/api/") {
        Route::Api
    } else {
        Route::Static
    }
}
