//! Configuration for the client controller, the offline cache worker and the
//! proxy that hosts it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`ClientConfig::base_url`] and
/// [`WorkerConfig::origin`].
pub const BASE_URL_ENV: &str = "LOTTOPRO_BASE_URL";

/// Written above the settings of every saved config file.
const FILE_HEADER: &str = "\
# lottopro configuration
#
# Durations are in milliseconds (keys ending in _ms).
# LOTTOPRO_BASE_URL overrides client.base_url and worker.origin.

";

/// Serializes a `Duration` as whole milliseconds.
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Settings for talking to the prediction backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend (or of the proxy in front of it).
    pub base_url: String,
    /// Deadline for `POST /api/predict`.
    #[serde(with = "millis", rename = "predict_timeout_ms")]
    pub predict_timeout: Duration,
    /// Deadline for the smaller GET endpoints.
    #[serde(with = "millis", rename = "request_timeout_ms")]
    pub request_timeout: Duration,
    /// Period of the example-number refresh.
    #[serde(with = "millis", rename = "refresh_interval_ms")]
    pub refresh_interval: Duration,
    /// Retries after a failed example-number fetch.
    pub retry_attempts: u32,
    /// Back-off step; attempt `n` waits `n * retry_step`.
    #[serde(with = "millis", rename = "retry_step_ms")]
    pub retry_step: Duration,
    /// Quiet period before a manual refresh fires.
    #[serde(with = "millis", rename = "debounce_ms")]
    pub debounce: Duration,
    /// Interval of the loading status ticker.
    #[serde(with = "millis", rename = "loading_tick_ms")]
    pub loading_tick: Duration,
    /// Delay before scrolling to fresh results.
    #[serde(with = "millis", rename = "scroll_delay_ms")]
    pub scroll_delay: Duration,
    /// Gap between revealing two recommendation cards.
    #[serde(with = "millis", rename = "card_reveal_delay_ms")]
    pub card_reveal_delay: Duration,
    /// Gap between revealing two model sections.
    #[serde(with = "millis", rename = "section_reveal_delay_ms")]
    pub section_reveal_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            predict_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30),
            retry_attempts: 3,
            retry_step: Duration::from_secs(2),
            debounce: Duration::from_secs(1),
            loading_tick: Duration::from_millis(1500),
            scroll_delay: Duration::from_millis(500),
            card_reveal_delay: Duration::from_millis(100),
            section_reveal_delay: Duration::from_millis(200),
        }
    }
}

impl ClientConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backend base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the prediction deadline.
    #[must_use]
    pub const fn with_predict_timeout(mut self, timeout: Duration) -> Self {
        self.predict_timeout = timeout;
        self
    }

    /// Sets the deadline for GET endpoints.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the retry schedule for example-number fetches.
    #[must_use]
    pub const fn with_retries(mut self, attempts: u32, step: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_step = step;
        self
    }

    /// Sets the staggered reveal delays.
    ///
    /// Headless front ends use `Duration::ZERO` to render at once.
    #[must_use]
    pub const fn with_reveal_delays(mut self, card: Duration, section: Duration) -> Self {
        self.card_reveal_delay = card;
        self.section_reveal_delay = section;
        self
    }

    /// Returns the back-off before retry `attempt` (1-based).
    #[must_use]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_step * attempt
    }
}

/// Settings for the offline cache worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Name of the static cache; bump it to rotate cached assets.
    pub cache_name: String,
    /// Name of the API response cache.
    pub api_cache_name: String,
    /// Origin the worker considers "same-origin".
    pub origin: String,
    /// Hosts whose assets are cached cache-first.
    pub cdn_hosts: Vec<String>,
    /// Resources fetched into the static cache on install.
    pub static_resources: Vec<String>,
    /// API paths whose successful GET responses are cached.
    pub cacheable_api: Vec<String>,
    /// Maximum age of a cached API response served while offline.
    #[serde(with = "millis", rename = "api_ttl_ms")]
    pub api_ttl: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cache_name: "lottopro-ai-v2-0-1".to_string(),
            api_cache_name: "lottopro-api-v2-0-1".to_string(),
            origin: "http://127.0.0.1:5000".to_string(),
            cdn_hosts: vec!["cdnjs.cloudflare.com".to_string()],
            static_resources: [
                "/",
                "/static/css/style.css",
                "/static/js/app.js",
                "/static/manifest.json",
                "https://cdnjs.cloudflare.com/ajax/libs/bootstrap/5.3.0/css/bootstrap.min.css",
                "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css",
                "https://cdnjs.cloudflare.com/ajax/libs/bootstrap/5.3.0/js/bootstrap.bundle.min.js",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            cacheable_api: ["/api/health", "/api/stats", "/api/example-numbers"]
                .into_iter()
                .map(String::from)
                .collect(),
            api_ttl: Duration::from_secs(5 * 60),
        }
    }
}

impl WorkerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the same-origin base.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Replaces the install-time resource list.
    #[must_use]
    pub fn with_static_resources(mut self, resources: Vec<String>) -> Self {
        self.static_resources = resources;
        self
    }

    /// Sets the cache names.
    #[must_use]
    pub fn with_cache_names(mut self, cache: impl Into<String>, api: impl Into<String>) -> Self {
        self.cache_name = cache.into();
        self.api_cache_name = api.into();
        self
    }

    /// Returns true if the two current caches include `name`.
    #[must_use]
    pub fn is_current_cache(&self, name: &str) -> bool {
        name == self.cache_name || name == self.api_cache_name
    }
}

/// Proxy server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Where the cache snapshot is kept between runs.
    pub snapshot_path: Option<PathBuf>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8723,
            snapshot_path: dirs::data_dir().map(|d| d.join("lottopro").join("cache.toml")),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend client settings.
    pub client: ClientConfig,
    /// Offline cache worker settings.
    pub worker: WorkerConfig,
    /// Proxy settings.
    pub proxy: ProxyConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lottopro")
            .join("config.toml")
    }

    /// Loads configuration from `path`, writing a default file first when it
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, written, or parsed.
    pub fn load_or_create(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            log::info!("Wrote default config to {}", path.display());
            return Ok(config);
        }
        Self::load(path)
    }

    /// Loads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to `path` atomically (write tmp + rename).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("toml.tmp");
        let contents = format!("{FILE_HEADER}{}", toml::to_string_pretty(self)?);
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Applies environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            let url = url.trim_end_matches('/').to_string();
            self.client.base_url.clone_from(&url);
            self.worker.origin = url;
        }
        self
    }

    /// Rejects values that would break the worker or the client.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] describing the first bad value.
    pub fn validate(&self) -> crate::Result<()> {
        if reqwest::Url::parse(&self.client.base_url).is_err() {
            return Err(crate::Error::Config(format!(
                "client.base_url is not a URL: {}",
                self.client.base_url
            )));
        }
        if reqwest::Url::parse(&self.worker.origin).is_err() {
            return Err(crate::Error::Config(format!(
                "worker.origin is not a URL: {}",
                self.worker.origin
            )));
        }
        if self.worker.cache_name == self.worker.api_cache_name {
            return Err(crate::Error::Config(
                "worker.cache_name and worker.api_cache_name must differ".to_string(),
            ));
        }
        Ok(())
    }
}
