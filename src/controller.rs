//! Prediction request lifecycle.
//!
//! A submission moves the controller from idle to loading, calls the
//! backend under a deadline, reveals the result through the [`View`] and
//! returns to idle on every exit path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::DropGuard;

use crate::client::{LottoApi, bounded};
use crate::config::ClientConfig;
use crate::error::Error;
use crate::model::PredictionResponse;
use crate::numbers::NumberForm;
use crate::render::{PredictionView, render_prediction};
use crate::tasks::{Scheduler, SingleFlight};
use crate::view::{Toast, ToastLevel, View};

/// Status lines cycled while a prediction is running.
pub const LOADING_MESSAGES: [&str; 7] = [
    "Loading historical draw data...",
    "Running the frequency model...",
    "Running the trend model...",
    "Running the pattern model...",
    "Running the statistical model...",
    "Running the machine learning model...",
    "Combining model results...",
];

/// Where the controller is in the request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Loading,
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A prediction was already running; nothing happened.
    Busy,
    /// The form held duplicates and was not sent.
    Rejected,
    /// The prediction was revealed.
    Rendered(PredictionView),
    /// The request failed; carries the message shown to the user.
    Failed(String),
}

/// Leaves the loading state when dropped.
struct Loading<'a> {
    view: &'a dyn View,
    _ticker: DropGuard,
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.view.set_loading(false);
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Drives predictions from the form to the view.
pub struct PredictionController {
    api: Arc<dyn LottoApi>,
    view: Arc<dyn View>,
    config: ClientConfig,
    scheduler: Scheduler,
    flight: SingleFlight,
    current: Mutex<Option<PredictionResponse>>,
}

impl PredictionController {
    /// Creates a controller whose timers are owned by `scheduler`.
    #[must_use]
    pub fn new(
        api: Arc<dyn LottoApi>,
        view: Arc<dyn View>,
        config: ClientConfig,
        scheduler: Scheduler,
    ) -> Self {
        Self {
            api,
            view,
            config,
            scheduler,
            flight: SingleFlight::new(),
            current: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        if self.flight.is_busy() {
            LifecycleState::Loading
        } else {
            LifecycleState::Idle
        }
    }

    /// The last prediction that was revealed.
    pub async fn current(&self) -> Option<PredictionResponse> {
        self.current.lock().await.clone()
    }

    /// Submits the form.
    ///
    /// Failures are reported through the view and the returned outcome;
    /// this never errors.
    pub async fn submit(&self, form: &NumberForm) -> SubmitOutcome {
        let Some(_flight) = self.flight.try_acquire() else {
            log::debug!("prediction already running, ignoring submit");
            return SubmitOutcome::Busy;
        };

        if form.has_duplicates() {
            self.view.toast(&Toast::new(
                ToastLevel::Error,
                "Please remove duplicate numbers before predicting.",
            ));
            return SubmitOutcome::Rejected;
        }

        let request = form.to_request();
        let _loading = self.start_loading();
        log::info!("requesting prediction for {:?}", request.user_numbers);

        let result = bounded(
            self.config.predict_timeout,
            self.scheduler.token(),
            self.api.predict(&request),
        )
        .await
        .and_then(|response| {
            if response.success {
                Ok(response)
            } else {
                Err(Error::Api(response.error.clone().unwrap_or_default()))
            }
        });

        match result {
            Ok(response) => {
                let view = render_prediction(&response);
                self.reveal(&view).await;
                *self.current.lock().await = Some(response);

                let message = if view.user_numbers.is_empty() {
                    "Fully random AI prediction is complete!".to_string()
                } else {
                    format!(
                        "AI prediction including your {} preferred numbers is complete!",
                        view.user_numbers.len()
                    )
                };
                self.view.toast(&Toast::new(ToastLevel::Success, message));

                let target = Arc::clone(&self.view);
                self.scheduler
                    .spawn_after(self.config.scroll_delay, move || async move {
                        target.scroll_to_results();
                    });
                SubmitOutcome::Rendered(view)
            }
            Err(e) => {
                log::error!("prediction failed: {e}");
                let message = e.user_message();
                self.view.toast(&Toast::new(ToastLevel::Error, message.clone()));
                SubmitOutcome::Failed(message)
            }
        }
    }

    /// Enters the loading state and starts the status ticker.
    fn start_loading(&self) -> Loading<'_> {
        self.view.set_loading(true);

        let ticker = self.scheduler.child_token();
        let token = ticker.clone();
        let view = Arc::clone(&self.view);
        let period = self.config.loading_tick;
        self.scheduler.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            for text in LOADING_MESSAGES.iter().cycle() {
                tokio::select! {
                    _ = interval.tick() => view.loading_status(text),
                    () = token.cancelled() => break,
                }
            }
        });

        Loading {
            view: self.view.as_ref(),
            _ticker: ticker.drop_guard(),
        }
    }

    /// Feeds the view model to the view, top picks first.
    async fn reveal(&self, prediction: &PredictionView) {
        self.view.clear_results();
        for card in &prediction.top {
            self.view.append_recommendation(card);
            pause(self.config.card_reveal_delay).await;
        }
        for section in &prediction.models {
            self.view.append_model_section(section);
            pause(self.config.section_reveal_delay).await;
        }
    }
}
