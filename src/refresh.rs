//! Periodic example-number refresh with retry and local fallback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::RwLock;

use crate::client::{LottoApi, bounded};
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::generator::generate_examples;
use crate::model::{ExampleNumbers, MAX_NUMBER, MIN_NUMBER, PICK_COUNT};
use crate::render::render_examples;
use crate::tasks::{Scheduler, SingleFlight};
use crate::view::View;

/// How one refresh ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another refresh was already running.
    Busy,
    /// The backend answered.
    Fetched(ExampleNumbers),
    /// Every attempt failed and the numbers were generated locally.
    Generated(ExampleNumbers),
    /// Shutdown interrupted the refresh.
    Cancelled,
}

/// Checks that an example set is six unique numbers in range.
fn validate(examples: ExampleNumbers) -> Result<ExampleNumbers> {
    if !examples.success {
        return Err(Error::Api("example numbers unavailable".to_string()));
    }
    let numbers = &examples.example_numbers;
    let in_range = numbers
        .iter()
        .all(|n| (MIN_NUMBER..=MAX_NUMBER).contains(n));
    let mut unique = numbers.clone();
    unique.sort_unstable();
    unique.dedup();
    if numbers.len() != PICK_COUNT || unique.len() != PICK_COUNT || !in_range {
        return Err(Error::Api(format!("invalid example numbers {numbers:?}")));
    }
    Ok(examples)
}

struct Inner {
    api: Arc<dyn LottoApi>,
    view: Arc<dyn View>,
    config: ClientConfig,
    scheduler: Scheduler,
    flight: SingleFlight,
    hot: RwLock<Vec<u8>>,
    generation: AtomicU64,
}

/// Keeps the example-number panel fresh.
///
/// Cloning is cheap; clones share one refresh guard.
#[derive(Clone)]
pub struct ExampleRefresher {
    inner: Arc<Inner>,
}

impl ExampleRefresher {
    #[must_use]
    pub fn new(
        api: Arc<dyn LottoApi>,
        view: Arc<dyn View>,
        config: ClientConfig,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                view,
                config,
                scheduler,
                flight: SingleFlight::new(),
                hot: RwLock::new(Vec::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Remembers the hot numbers of the last successful statistics call.
    pub async fn remember_hot(&self, hot: Vec<u8>) {
        *self.inner.hot.write().await = hot;
    }

    pub async fn hot(&self) -> Vec<u8> {
        self.inner.hot.read().await.clone()
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.flight.is_busy()
    }

    /// Refreshes now and then every `refresh_interval`.
    pub fn start(&self) {
        let this = self.clone();
        self.inner
            .scheduler
            .spawn_every(self.inner.config.refresh_interval, move || {
                let this = this.clone();
                async move {
                    this.refresh().await;
                }
            });
    }

    /// Schedules a refresh once clicks have been quiet for `debounce`.
    pub fn manual_trigger(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let this = self.clone();
        self.inner
            .scheduler
            .spawn_after(self.inner.config.debounce, move || async move {
                if this.inner.generation.load(Ordering::Acquire) == generation {
                    this.refresh().await;
                }
            });
    }

    /// Fetches example numbers, retrying and finally generating them.
    pub async fn refresh(&self) -> RefreshOutcome {
        let inner = &self.inner;
        let Some(_flight) = inner.flight.try_acquire() else {
            log::debug!("example refresh already running");
            return RefreshOutcome::Busy;
        };

        let mut attempt = 0;
        loop {
            match self.fetch().await {
                Ok(examples) => {
                    inner.view.show_examples(&render_examples(&examples));
                    return RefreshOutcome::Fetched(examples);
                }
                Err(Error::Cancelled) => return RefreshOutcome::Cancelled,
                Err(e) if attempt < inner.config.retry_attempts => {
                    attempt += 1;
                    let delay = inner.config.retry_delay(attempt);
                    log::warn!(
                        "example numbers failed ({e}), retry {attempt}/{} in {delay:?}",
                        inner.config.retry_attempts
                    );
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = inner.scheduler.token().cancelled() => {
                            return RefreshOutcome::Cancelled;
                        }
                    }
                }
                Err(e) => {
                    log::warn!("example numbers failed ({e}), generating locally");
                    break;
                }
            }
        }

        let hot = self.hot().await;
        let examples = generate_examples(&mut StdRng::from_entropy(), &hot);
        inner.view.show_examples(&render_examples(&examples));
        RefreshOutcome::Generated(examples)
    }

    async fn fetch(&self) -> Result<ExampleNumbers> {
        let inner = &self.inner;
        let examples = bounded(
            inner.config.request_timeout,
            inner.scheduler.token(),
            inner.api.example_numbers(),
        )
        .await?;
        validate(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    use crate::generator::LOCAL_SOURCE;
    use crate::testing::{RecordingView, StubApi, examples};

    fn refresher(api: StubApi) -> (ExampleRefresher, Arc<StubApi>, Arc<RecordingView>) {
        let api = Arc::new(api);
        let view = Arc::new(RecordingView::default());
        let refresher = ExampleRefresher::new(
            Arc::clone(&api) as Arc<dyn LottoApi>,
            Arc::clone(&view) as Arc<dyn View>,
            ClientConfig::default(),
            Scheduler::new(),
        );
        (refresher, api, view)
    }

    fn offline() -> Result<ExampleNumbers> {
        Err(Error::Offline("down".to_string()))
    }

    #[tokio::test]
    async fn shows_backend_numbers() {
        let (refresher, api, view) =
            refresher(StubApi::new().push_examples(Ok(examples([3, 11, 19, 27, 35, 43]))));

        let outcome = refresher.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Fetched(_)));
        assert_eq!(api.example_calls(), 1);
        let shown = view.examples();
        assert_eq!(shown.len(), 1);
        assert!(!shown[0].local);
        assert_eq!(shown[0].sum, 138);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_growing_backoff() {
        let api = StubApi::new()
            .push_examples(offline())
            .push_examples(offline())
            .push_examples(Ok(examples([1, 2, 3, 4, 5, 6])));
        let (refresher, api, _view) = refresher(api);

        let start = Instant::now();
        let outcome = refresher.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Fetched(_)));
        assert_eq!(api.example_calls(), 3);
        // 2 s + 4 s
        assert_eq!(start.elapsed().as_secs(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_local_generator() {
        let (refresher, api, view) = refresher(StubApi::new());
        refresher.remember_hot(vec![7, 13, 21, 34]).await;

        let start = Instant::now();
        let RefreshOutcome::Generated(generated) = refresher.refresh().await else {
            panic!("expected generated numbers");
        };
        assert_eq!(api.example_calls(), 4);
        assert_eq!(start.elapsed().as_secs(), 12);

        assert_eq!(generated.data_source.as_deref(), Some(LOCAL_SOURCE));
        let numbers = &generated.example_numbers;
        assert_eq!(numbers.len(), 6);
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
        assert!(numbers.iter().all(|n| (1..=45).contains(n)));
        assert!(view.examples()[0].local);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_backend_numbers_count_as_failure() {
        let bad = ExampleNumbers {
            success: true,
            example_numbers: vec![1, 1, 2, 3, 4, 5],
            ..ExampleNumbers::default()
        };
        let api = StubApi::new()
            .push_examples(Ok(bad))
            .push_examples(Ok(examples([8, 16, 24, 32, 40, 44])));
        let (refresher, api, _view) = refresher(api);

        let RefreshOutcome::Fetched(fetched) = refresher.refresh().await else {
            panic!("expected fetched numbers");
        };
        assert_eq!(fetched.example_numbers, vec![8, 16, 24, 32, 40, 44]);
        assert_eq!(api.example_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refresh_is_busy() {
        let api = StubApi::new()
            .with_delay(Duration::from_secs(1))
            .push_examples(Ok(examples([1, 2, 3, 4, 5, 6])));
        let (refresher, api, _view) = refresher(api);

        let first = {
            let refresher = refresher.clone();
            tokio::spawn(async move { refresher.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(refresher.is_refreshing());
        assert_eq!(refresher.refresh().await, RefreshOutcome::Busy);
        assert!(matches!(first.await.unwrap(), RefreshOutcome::Fetched(_)));
        assert_eq!(api.example_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_clicks_are_debounced() {
        let api = StubApi::new().push_examples(Ok(examples([1, 2, 3, 4, 5, 6])));
        let (refresher, api, _view) = refresher(api);

        refresher.manual_trigger();
        tokio::time::sleep(Duration::from_millis(300)).await;
        refresher.manual_trigger();
        tokio::time::sleep(Duration::from_millis(300)).await;
        refresher.manual_trigger();

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(api.example_calls(), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(api.example_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn start_refreshes_immediately_and_periodically() {
        let api = StubApi::new()
            .push_examples(Ok(examples([1, 2, 3, 4, 5, 6])))
            .push_examples(Ok(examples([7, 8, 9, 10, 11, 12])));
        let (refresher, api, view) = refresher(api);

        refresher.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.example_calls(), 1);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.example_calls(), 2);
        assert_eq!(view.examples().len(), 2);
        refresher.inner.scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_backoff() {
        let (refresher, _api, _view) = refresher(StubApi::new());
        let task = {
            let refresher = refresher.clone();
            tokio::spawn(async move { refresher.refresh().await })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        refresher.inner.scheduler.token().cancel();
        assert_eq!(task.await.unwrap(), RefreshOutcome::Cancelled);
    }
}
