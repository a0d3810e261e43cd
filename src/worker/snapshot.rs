//! Persisting cache storage between proxy runs.

use std::collections::BTreeMap;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use super::cache::{CacheStorage, Entries};
use super::fetch::WorkerResponse;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EntrySnapshot {
    url: String,
    status: u16,
    #[serde(default)]
    headers: Vec<(String, String)>,
    /// Base64 of the body.
    body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheSnapshot {
    name: String,
    #[serde(default)]
    entries: Vec<EntrySnapshot>,
}

/// Every cache at one point in time, in a TOML-friendly shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    caches: Vec<CacheSnapshot>,
}

impl EntrySnapshot {
    fn capture(url: &str, response: &WorkerResponse) -> Self {
        Self {
            url: url.to_string(),
            status: response.status.as_u16(),
            // Headers that are not UTF-8 are dropped.
            headers: response
                .headers
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .to_str()
                        .ok()
                        .map(|v| (name.as_str().to_string(), v.to_string()))
                })
                .collect(),
            body: STANDARD.encode(&response.body),
        }
    }

    fn restore(self) -> Result<(String, WorkerResponse)> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|e| Error::Config(format!("bad status in snapshot for {}: {e}", self.url)))?;
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::Config(format!("bad header {name}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::Config(format!("bad header value {value}: {e}")))?;
            headers.append(name, value);
        }
        let body = STANDARD
            .decode(&self.body)
            .map_err(|e| Error::Config(format!("bad body in snapshot for {}: {e}", self.url)))?;
        Ok((
            self.url,
            WorkerResponse {
                status,
                headers,
                body: body.into(),
            },
        ))
    }
}

impl Snapshot {
    /// Captures every cache in `storage`.
    pub async fn capture(storage: &CacheStorage, now: DateTime<Utc>) -> Self {
        let caches = storage
            .dump()
            .await
            .into_iter()
            .map(|(name, entries)| CacheSnapshot {
                name,
                entries: entries
                    .iter()
                    .map(|(url, response)| EntrySnapshot::capture(url, response))
                    .collect(),
            })
            .collect();
        Self {
            saved_at: now,
            caches,
        }
    }

    /// Total number of cached responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.iter().map(|c| c.entries.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the snapshot back into `storage`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an entry is malformed; nothing is
    /// restored in that case.
    pub async fn restore(self, storage: &CacheStorage) -> Result<usize> {
        let mut caches: BTreeMap<String, Entries> = BTreeMap::new();
        let mut count = 0;
        for cache in self.caches {
            let entries = caches.entry(cache.name).or_default();
            for entry in cache.entries {
                let (url, response) = entry.restore()?;
                entries.insert(url, response);
                count += 1;
            }
        }
        storage.restore(caches).await;
        Ok(count)
    }

    /// Saves the snapshot atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        std::fs::write(&tmp_path, toml::to_string(self)?)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Loads a snapshot, or `None` if there is no file yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok(Some(toml::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
