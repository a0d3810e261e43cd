//! Named response caches keyed by URL.

use std::collections::BTreeMap;

use reqwest::Url;
use tokio::sync::RwLock;

use super::fetch::{WorkerRequest, WorkerResponse};

/// One named cache: URL to response.
pub type Entries = BTreeMap<String, WorkerResponse>;

/// Cache key of a URL; the fragment never reaches the server.
fn key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.into()
}

/// All caches of the worker.
///
/// Concurrent writes to one URL are last-write-wins.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: RwLock<BTreeMap<String, Entries>>,
}

impl CacheStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the cache `name` if it does not exist.
    pub async fn open(&self, name: &str) {
        self.caches
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }

    /// Stores `response` for `url` in cache `name`, creating the cache.
    pub async fn put(&self, name: &str, url: &Url, response: WorkerResponse) {
        self.caches
            .write()
            .await
            .entry(name.to_string())
            .or_default()
            .insert(key(url), response);
    }

    /// Stores every entry under one lock so readers never see part of them.
    pub async fn put_all(&self, name: &str, entries: Vec<(Url, WorkerResponse)>) {
        let mut caches = self.caches.write().await;
        let cache = caches.entry(name.to_string()).or_default();
        for (url, response) in entries {
            cache.insert(key(&url), response);
        }
    }

    /// Looks `request` up in every cache, in name order.
    ///
    /// Only GET and HEAD requests ever match.
    pub async fn match_request(&self, request: &WorkerRequest) -> Option<WorkerResponse> {
        if !request.is_cacheable_method() {
            return None;
        }
        let key = key(&request.url);
        self.caches
            .read()
            .await
            .values()
            .find_map(|cache| cache.get(&key).cloned())
    }

    /// Keeps the entries of cache `name` that `keep` accepts; returns how
    /// many were removed.
    pub async fn retain(&self, name: &str, mut keep: impl FnMut(&WorkerResponse) -> bool) -> usize {
        let mut caches = self.caches.write().await;
        let Some(cache) = caches.get_mut(name) else {
            return 0;
        };
        let before = cache.len();
        cache.retain(|_, response| keep(response));
        before - cache.len()
    }

    /// Names of all caches.
    pub async fn keys(&self) -> Vec<String> {
        self.caches.read().await.keys().cloned().collect()
    }

    pub async fn has(&self, name: &str) -> bool {
        self.caches.read().await.contains_key(name)
    }

    /// Deletes cache `name`, returning whether it existed.
    pub async fn delete(&self, name: &str) -> bool {
        self.caches.write().await.remove(name).is_some()
    }

    /// Number of entries in cache `name`.
    pub async fn len(&self, name: &str) -> usize {
        self.caches.read().await.get(name).map_or(0, BTreeMap::len)
    }

    /// A copy of every cache.
    pub async fn dump(&self) -> BTreeMap<String, Entries> {
        self.caches.read().await.clone()
    }

    /// Merges `caches` into storage, replacing entries with the same URL.
    pub async fn restore(&self, caches: BTreeMap<String, Entries>) {
        let mut current = self.caches.write().await;
        for (name, entries) in caches {
            current.entry(name).or_default().extend(entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::{Method, StatusCode};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn ok(body: &'static str) -> WorkerResponse {
        WorkerResponse::new(StatusCode::OK).with_body(body)
    }

    #[tokio::test]
    async fn get_and_head_match_post_does_not() {
        let storage = CacheStorage::new();
        storage.put("static", &url("http://a/x"), ok("x")).await;

        let get = WorkerRequest::get(url("http://a/x"));
        assert_eq!(storage.match_request(&get).await.unwrap().body, "x");
        let head = WorkerRequest::new(Method::HEAD, url("http://a/x"));
        assert!(storage.match_request(&head).await.is_some());
        let post = WorkerRequest::new(Method::POST, url("http://a/x"));
        assert!(storage.match_request(&post).await.is_none());
    }

    #[tokio::test]
    async fn fragment_is_ignored() {
        let storage = CacheStorage::new();
        storage.put("static", &url("http://a/x#top"), ok("x")).await;
        let request = WorkerRequest::get(url("http://a/x"));
        assert!(storage.match_request(&request).await.is_some());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let storage = CacheStorage::new();
        storage.put("api", &url("http://a/api/stats"), ok("one")).await;
        storage.put("api", &url("http://a/api/stats"), ok("two")).await;
        let request = WorkerRequest::get(url("http://a/api/stats"));
        assert_eq!(storage.match_request(&request).await.unwrap().body, "two");
        assert_eq!(storage.len("api").await, 1);
    }

    #[tokio::test]
    async fn retain_drops_rejected_entries() {
        let storage = CacheStorage::new();
        storage.put("api", &url("http://a/1"), ok("keep")).await;
        storage.put("api", &url("http://a/2"), ok("drop")).await;
        assert_eq!(storage.retain("api", |r| r.body == "keep").await, 1);
        assert_eq!(storage.len("api").await, 1);
        assert_eq!(storage.retain("missing", |_| false).await, 0);
    }

    #[tokio::test]
    async fn delete_and_keys() {
        let storage = CacheStorage::new();
        storage.open("old").await;
        storage.open("new").await;
        assert_eq!(storage.keys().await, vec!["new", "old"]);
        assert!(storage.delete("old").await);
        assert!(!storage.delete("old").await);
        assert!(!storage.has("old").await);
    }
}
