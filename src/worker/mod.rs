//! The offline cache worker.
//!
//! Sits between a page and the network. Static assets are served cache
//! first, API calls network first with a short-lived fallback copy, and
//! when nothing can answer the worker synthesizes an offline response.

pub mod cache;
pub mod fetch;
pub mod offline;
pub mod route;
pub mod snapshot;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use futures::future::try_join_all;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{Error, Result};

pub use cache::CacheStorage;
pub use fetch::{CACHED_AT_HEADER, Fetcher, ReqwestFetcher, WorkerRequest, WorkerResponse};
pub use route::{Route, classify};

/// Lifecycle of the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Fetching the static resource list.
    Installing,
    /// Installed but waiting; requests bypass the worker.
    Installed,
    /// Dropping stale caches.
    Activating,
    /// Handling requests.
    Activated,
}

/// A message posted to the worker by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    SkipWaiting,
    GetVersion,
}

/// The worker's answer to a [`WorkerMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerReply {
    VersionInfo { version: String },
}

/// Data of a push event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub primary_key: Option<u64>,
}

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub date_of_arrival: DateTime<Utc>,
    pub primary_key: u64,
}

/// A notification to show for a push event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

const DEFAULT_TITLE: &str = "LottoPro AI";
const DEFAULT_BODY: &str = "There is news from LottoPro AI.";
const ICON: &str = "/static/icons/icon-192x192.png";
const BADGE: &str = "/static/icons/badge-72x72.png";
/// Tag of the sync event that checks backend health.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// The offline cache worker.
pub struct OfflineWorker<F> {
    config: WorkerConfig,
    origin: Url,
    fetcher: F,
    storage: Arc<CacheStorage>,
    state: RwLock<WorkerState>,
    /// Registered clients and whether the worker controls them.
    clients: RwLock<BTreeMap<Uuid, bool>>,
}

impl<F: Fetcher> OfflineWorker<F> {
    /// Creates a worker with empty caches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured origin is not a URL.
    pub fn new(config: WorkerConfig, fetcher: F) -> Result<Self> {
        Self::with_storage(config, fetcher, Arc::new(CacheStorage::new()))
    }

    /// Creates a worker over existing storage, e.g. a restored snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured origin is not a URL.
    pub fn with_storage(
        config: WorkerConfig,
        fetcher: F,
        storage: Arc<CacheStorage>,
    ) -> Result<Self> {
        let origin = Url::parse(&config.origin)
            .map_err(|e| Error::Config(format!("invalid worker origin {}: {e}", config.origin)))?;
        Ok(Self {
            config,
            origin,
            fetcher,
            storage,
            state: RwLock::new(WorkerState::Installing),
            clients: RwLock::new(BTreeMap::new()),
        })
    }

    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    #[must_use]
    pub const fn config(&self) -> &WorkerConfig {
        &self.config
    }

    #[must_use]
    pub const fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    async fn set_state(&self, state: WorkerState) {
        log::debug!("worker state: {state:?}");
        *self.state.write().await = state;
    }

    /// Resolves a path or absolute URL against the origin.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `target` cannot be resolved.
    pub fn resolve(&self, target: &str) -> Result<Url> {
        self.origin
            .join(target)
            .map_err(|e| Error::Config(format!("invalid resource {target}: {e}")))
    }

    /// The same-origin URL for a request target's path and query.
    ///
    /// Unlike [`resolve`](Self::resolve) this never leaves the origin, even
    /// for scheme-relative paths such as `//host/x`.
    #[must_use]
    pub fn local_url(&self, path: &str, query: Option<&str>) -> Url {
        let mut url = self.origin.clone();
        url.set_path(path);
        url.set_query(query);
        url
    }

    /// Registers a page; it is controlled once the worker activates.
    pub async fn register_client(&self) -> Uuid {
        let id = Uuid::new_v4();
        let controlled = self.state().await == WorkerState::Activated;
        self.clients.write().await.insert(id, controlled);
        id
    }

    pub async fn controls(&self, client: Uuid) -> bool {
        self.clients
            .read()
            .await
            .get(&client)
            .copied()
            .unwrap_or(false)
    }

    /// Fetches the static resource list into the static cache.
    ///
    /// Either every resource is stored or none is. On success the worker
    /// skips waiting and activates; on failure it stays installed and
    /// waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Install`] if any resource fails to load.
    pub async fn install(&self) -> Result<()> {
        self.set_state(WorkerState::Installing).await;
        log::info!(
            "installing worker, caching {} static resources",
            self.config.static_resources.len()
        );

        match self.fetch_static_resources().await {
            Ok(entries) => {
                self.storage.put_all(&self.config.cache_name, entries).await;
                self.set_state(WorkerState::Installed).await;
                log::info!("static resources cached");
                self.activate().await;
                Ok(())
            }
            Err(e) => {
                log::error!("worker install failed: {e}");
                self.set_state(WorkerState::Installed).await;
                Err(e)
            }
        }
    }

    async fn fetch_static_resources(&self) -> Result<Vec<(Url, WorkerResponse)>> {
        let urls = self
            .config
            .static_resources
            .iter()
            .map(|r| self.resolve(r))
            .collect::<Result<Vec<_>>>()?;
        let fetches = urls.into_iter().map(|url| async move {
            let response = self
                .fetcher
                .fetch(&WorkerRequest::get(url.clone()))
                .await
                .map_err(|e| Error::Install(format!("{url}: {e}")))?;
            if !response.is_success() {
                return Err(Error::Install(format!("{url}: HTTP {}", response.status)));
            }
            Ok((url, response))
        });
        try_join_all(fetches).await
    }

    /// Drops every cache that is not current and claims all clients.
    pub async fn activate(&self) {
        self.set_state(WorkerState::Activating).await;
        for name in self.storage.keys().await {
            if !self.config.is_current_cache(&name) {
                log::info!("deleting old cache {name}");
                self.storage.delete(&name).await;
            }
        }
        for controlled in self.clients.write().await.values_mut() {
            *controlled = true;
        }
        self.set_state(WorkerState::Activated).await;
        log::info!("worker activated ({})", self.config.cache_name);
    }

    /// Handles a message from a page.
    pub async fn handle_message(&self, message: WorkerMessage) -> Option<WorkerReply> {
        log::debug!("worker message: {message:?}");
        match message {
            WorkerMessage::SkipWaiting => {
                if self.state().await != WorkerState::Activated {
                    self.activate().await;
                }
                None
            }
            WorkerMessage::GetVersion => Some(WorkerReply::VersionInfo {
                version: self.config.cache_name.clone(),
            }),
        }
    }

    /// Answers `request`.
    ///
    /// # Errors
    ///
    /// Returns the network error for cross-origin and non-document static
    /// requests that neither the cache nor the network can answer.
    pub async fn handle_fetch(&self, request: &WorkerRequest) -> Result<WorkerResponse> {
        self.handle_fetch_at(request, Utc::now()).await
    }

    /// [`handle_fetch`](Self::handle_fetch) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`handle_fetch`](Self::handle_fetch).
    pub async fn handle_fetch_at(
        &self,
        request: &WorkerRequest,
        now: DateTime<Utc>,
    ) -> Result<WorkerResponse> {
        if self.state().await != WorkerState::Activated {
            return self.fetcher.fetch(request).await;
        }
        match classify(&request.url, &self.origin, &self.config.cdn_hosts) {
            Route::CdnAsset => self.cache_first(request).await.inspect_err(|e| {
                log::error!("CDN request {} failed: {e}", request.url);
            }),
            Route::Passthrough => self.fetcher.fetch(request).await,
            Route::Api => Ok(self.network_first(request, now).await),
            Route::Static => self.static_first(request).await,
        }
    }

    /// Serves from any cache, else the network, storing 2xx GETs.
    async fn cache_first(&self, request: &WorkerRequest) -> Result<WorkerResponse> {
        if let Some(hit) = self.storage.match_request(request).await {
            return Ok(hit);
        }
        let response = self.fetcher.fetch(request).await?;
        if response.is_success() && request.method == Method::GET {
            self.storage
                .put(&self.config.cache_name, &request.url, response.clone())
                .await;
        }
        Ok(response)
    }

    async fn static_first(&self, request: &WorkerRequest) -> Result<WorkerResponse> {
        match self.cache_first(request).await {
            Ok(response) => Ok(response),
            Err(e) if request.url.path() == "/" || request.accepts_html() => {
                log::warn!("serving offline page for {}: {e}", request.url);
                Ok(offline::offline_page())
            }
            Err(e) => {
                log::error!("static request {} failed: {e}", request.url);
                Err(e)
            }
        }
    }

    fn is_cacheable_api(&self, request: &WorkerRequest) -> bool {
        request.method == Method::GET
            && self
                .config
                .cacheable_api
                .iter()
                .any(|p| p == request.url.path())
    }

    /// Tries the network, then a fresh cached copy, then gives up offline.
    async fn network_first(&self, request: &WorkerRequest, now: DateTime<Utc>) -> WorkerResponse {
        match self.fetcher.fetch(request).await {
            Ok(response) if response.is_success() => {
                if self.is_cacheable_api(request) {
                    self.storage
                        .put(
                            &self.config.api_cache_name,
                            &request.url,
                            response.stamped(now),
                        )
                        .await;
                    self.prune_api_cache(now).await;
                }
                return response;
            }
            Ok(response) => {
                log::info!("API {} answered {}, trying cache", request.url, response.status);
            }
            Err(e) => log::info!("API {} unreachable ({e}), trying cache", request.url),
        }

        if let Some(cached) = self.storage.match_request(request).await {
            if self.is_fresh(&cached, now) {
                log::info!("serving cached {}", request.url);
                return cached;
            }
        }
        offline::offline_api(now)
    }

    /// Whether a stamped API copy is younger than the API TTL at `now`.
    fn is_fresh(&self, response: &WorkerResponse, now: DateTime<Utc>) -> bool {
        let ttl = TimeDelta::from_std(self.config.api_ttl).unwrap_or(TimeDelta::MAX);
        response
            .cached_at()
            .is_some_and(|at| now.signed_duration_since(at) < ttl)
    }

    /// Drops API copies that can no longer be served; returns how many.
    pub async fn prune_api_cache(&self, now: DateTime<Utc>) -> usize {
        let removed = self
            .storage
            .retain(&self.config.api_cache_name, |response| {
                self.is_fresh(response, now)
            })
            .await;
        if removed > 0 {
            log::debug!("pruned {removed} expired API responses");
        }
        removed
    }

    /// Builds the notification for a push event; no payload, no notification.
    #[must_use]
    pub fn push(&self, payload: Option<PushPayload>, now: DateTime<Utc>) -> Option<Notification> {
        let payload = payload?;
        let action = |action: &str, title: &str, icon: &str| NotificationAction {
            action: action.to_string(),
            title: title.to_string(),
            icon: icon.to_string(),
        };
        Some(Notification {
            title: payload.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            body: payload.body.unwrap_or_else(|| DEFAULT_BODY.to_string()),
            icon: ICON.to_string(),
            badge: BADGE.to_string(),
            vibrate: vec![100, 50, 100],
            data: NotificationData {
                date_of_arrival: now,
                primary_key: payload.primary_key.unwrap_or(1),
            },
            actions: vec![
                action("explore", "Explore", "/static/icons/checkmark.png"),
                action("close", "Close", "/static/icons/xmark.png"),
            ],
        })
    }

    /// The page to open for a notification click, if any.
    #[must_use]
    pub fn notification_click(&self, action: Option<&str>) -> Option<Url> {
        (action == Some("explore")).then(|| self.origin.clone())
    }

    /// Handles a background sync event; returns whether it succeeded.
    pub async fn sync(&self, tag: &str) -> bool {
        if tag != BACKGROUND_SYNC_TAG {
            log::debug!("ignoring sync tag {tag}");
            return false;
        }
        let Ok(url) = self.resolve("/api/health") else {
            return false;
        };
        match self.fetcher.fetch(&WorkerRequest::get(url)).await {
            Ok(response) if response.is_success() => {
                log::info!("background sync succeeded");
                true
            }
            Ok(response) => {
                log::warn!("background sync got {}", response.status);
                false
            }
            Err(e) => {
                log::warn!("background sync failed: {e}");
                false
            }
        }
    }
}
