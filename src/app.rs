//! The client application: form, prediction controller and example refresh.

use std::sync::Arc;

use crate::client::{LottoApi, bounded};
use crate::config::ClientConfig;
use crate::controller::{PredictionController, SubmitOutcome};
use crate::numbers::{FieldState, InputFeedback, KeyAction, NumberForm};
use crate::refresh::ExampleRefresher;
use crate::render::{SHARE_TITLE, StatsView, copy_text, render_stats, share_text};
use crate::tasks::Scheduler;
use crate::view::{Toast, ToastLevel, View};

/// Owns every client-side component and the tasks they spawn.
///
/// Constructed by the entry point; call [`LottoApp::dispose`] when done.
pub struct LottoApp {
    form: NumberForm,
    api: Arc<dyn LottoApi>,
    view: Arc<dyn View>,
    config: ClientConfig,
    controller: PredictionController,
    refresher: ExampleRefresher,
    scheduler: Scheduler,
}

impl LottoApp {
    #[must_use]
    pub fn new(api: Arc<dyn LottoApi>, view: Arc<dyn View>, config: ClientConfig) -> Self {
        let scheduler = Scheduler::new();
        let controller = PredictionController::new(
            Arc::clone(&api),
            Arc::clone(&view),
            config.clone(),
            scheduler.clone(),
        );
        let refresher = ExampleRefresher::new(
            Arc::clone(&api),
            Arc::clone(&view),
            config.clone(),
            scheduler.clone(),
        );
        Self {
            form: NumberForm::new(),
            api,
            view,
            config,
            controller,
            refresher,
            scheduler,
        }
    }

    #[must_use]
    pub const fn form(&self) -> &NumberForm {
        &self.form
    }

    #[must_use]
    pub const fn controller(&self) -> &PredictionController {
        &self.controller
    }

    #[must_use]
    pub const fn refresher(&self) -> &ExampleRefresher {
        &self.refresher
    }

    /// Loads statistics and starts the periodic example refresh.
    pub async fn start(&self) {
        self.load_stats().await;
        self.refresher.start();
    }

    /// Fetches hot/cold statistics and caches the hot numbers for the
    /// local generator. Failures are logged and otherwise ignored.
    pub async fn load_stats(&self) -> Option<StatsView> {
        let stats = bounded(
            self.config.request_timeout,
            self.scheduler.token(),
            self.api.stats(),
        )
        .await;
        match stats {
            Ok(stats) => {
                let view = render_stats(&stats);
                self.view.show_stats(&view);
                self.refresher.remember_hot(stats.hot()).await;
                Some(view)
            }
            Err(e) => {
                log::warn!("could not load statistics: {e}");
                None
            }
        }
    }

    /// A keystroke in field `index`.
    pub fn on_input(&mut self, index: usize, raw: &str) -> InputFeedback {
        let feedback = self.form.input(index, raw);
        self.view.mark_field(index, feedback.state);
        if feedback.warn_duplicate {
            self.view.toast(&Toast::new(
                ToastLevel::Warning,
                "This number has already been entered.",
            ));
        }
        feedback
    }

    /// Field `index` lost focus.
    pub fn on_blur(&self, index: usize) -> FieldState {
        let feedback = self.form.blur(index);
        self.view.mark_field(index, feedback.state);
        feedback.state
    }

    /// Enter was pressed in field `index`: move on, or submit from the
    /// last field.
    pub async fn on_key_enter(&self, index: usize) -> Option<SubmitOutcome> {
        match NumberForm::enter(index) {
            KeyAction::Focus(next) => {
                self.view.focus_field(next);
                None
            }
            KeyAction::Submit => Some(self.on_submit().await),
        }
    }

    pub async fn on_submit(&self) -> SubmitOutcome {
        self.controller.submit(&self.form).await
    }

    /// The "new examples" button.
    pub fn on_examples_click(&self) {
        self.refresher.manual_trigger();
    }

    /// The copy button of a card; returns the clipboard text.
    pub fn on_copy(&self, numbers: &[u8]) -> String {
        let text = copy_text(numbers);
        self.view.toast(&Toast::new(
            ToastLevel::Success,
            format!("Numbers copied: {text}"),
        ));
        text
    }

    /// The share button of a card. Falls back to copying when the view
    /// cannot share; returns the text handed over.
    pub fn on_share(&self, numbers: &[u8]) -> String {
        let text = share_text(numbers);
        if self.view.share(SHARE_TITLE, &text) {
            return text;
        }
        log::debug!("sharing unavailable, copying instead");
        self.on_copy(numbers)
    }

    /// Empties the form and resets every field state.
    pub fn clear_form(&mut self) {
        self.form.clear();
        for index in 0..crate::numbers::FIELD_COUNT {
            self.view.mark_field(index, FieldState::Neutral);
        }
    }

    /// Cancels every timer and in-flight request and waits for them.
    pub async fn dispose(&self) {
        self.scheduler.shutdown().await;
        log::debug!("client disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::model::StatsResponse;
    use crate::testing::{Event, RecordingView, StubApi, examples};

    fn app(api: StubApi) -> (LottoApp, Arc<StubApi>, Arc<RecordingView>) {
        let api = Arc::new(api);
        let view = Arc::new(RecordingView::default());
        let app = LottoApp::new(
            Arc::clone(&api) as Arc<dyn LottoApi>,
            Arc::clone(&view) as Arc<dyn View>,
            ClientConfig::default(),
        );
        (app, api, view)
    }

    #[tokio::test]
    async fn duplicate_input_warns_and_marks_field() {
        let (mut app, _api, view) = app(StubApi::new());
        app.on_input(0, "12");
        let feedback = app.on_input(1, "12");
        assert_eq!(feedback.state, FieldState::Duplicate);

        let events = view.events();
        assert!(events.contains(&Event::Field(0, FieldState::Valid)));
        assert!(events.contains(&Event::Field(1, FieldState::Duplicate)));
        assert_eq!(view.toasts()[0].level, ToastLevel::Warning);

        assert_eq!(app.on_blur(0), FieldState::Duplicate);
    }

    #[tokio::test(start_paused = true)]
    async fn enter_moves_focus_then_submits() {
        let (mut app, api, view) = app(StubApi::new());
        app.on_input(0, "1");
        app.on_input(1, "2");
        app.on_input(2, "3");

        assert_eq!(app.on_key_enter(0).await, None);
        assert!(view.events().contains(&Event::Focus(1)));
        assert_eq!(api.predict_calls(), 0);

        let outcome = app.on_key_enter(5).await;
        let Some(SubmitOutcome::Rendered(rendered)) = outcome else {
            panic!("expected a submit from the last field");
        };
        assert_eq!(rendered.top[0].numbers(), vec![1, 2, 3, 10, 20, 30]);
        app.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_caches_hot_numbers_and_refreshes() {
        let stats = StatsResponse {
            hot_numbers: vec![(7, 30), (13, 28)],
            cold_numbers: vec![(44, 2)],
            ..StatsResponse::default()
        };
        let api = StubApi::new()
            .with_stats(stats)
            .push_examples(Ok(examples([5, 15, 25, 35, 40, 45])));
        let (app, api, view) = app(api);

        app.start().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(app.refresher().hot().await, vec![7, 13]);
        assert!(
            view.events()
                .iter()
                .any(|e| matches!(e, Event::Stats(s) if s.hot.len() == 2))
        );
        assert_eq!(api.example_calls(), 1);
        app.dispose().await;
    }

    #[tokio::test]
    async fn missing_stats_are_not_fatal() {
        let (app, _api, _view) = app(StubApi::new());
        assert!(app.load_stats().await.is_none());
        assert!(app.refresher().hot().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_stops_the_periodic_refresh() {
        let api = StubApi::new()
            .push_examples(Ok(examples([1, 2, 3, 4, 5, 6])))
            .push_examples(Ok(examples([1, 2, 3, 4, 5, 6])));
        let (app, api, _view) = app(api);
        app.refresher().start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        app.dispose().await;

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.example_calls(), 1);
    }

    #[tokio::test]
    async fn copy_returns_comma_separated_numbers() {
        let (app, _api, view) = app(StubApi::new());
        assert_eq!(app.on_copy(&[3, 9, 27]), "3, 9, 27");
        assert!(view.toasts()[0].message.ends_with("3, 9, 27"));
    }

    #[tokio::test]
    async fn share_uses_the_share_sheet_when_available() {
        let api = Arc::new(StubApi::new());
        let view = Arc::new(RecordingView::sharing());
        let app = LottoApp::new(
            api as Arc<dyn LottoApi>,
            Arc::clone(&view) as Arc<dyn View>,
            ClientConfig::default(),
        );

        let text = app.on_share(&[1, 2, 3, 10, 20, 30]);
        assert_eq!(text, "LottoPro AI recommended numbers: 1, 2, 3, 10, 20, 30");
        assert_eq!(view.events(), vec![Event::Share(text)]);
        assert!(view.toasts().is_empty());
    }

    #[tokio::test]
    async fn share_falls_back_to_copy() {
        let (app, _api, view) = app(StubApi::new());
        assert_eq!(app.on_share(&[5, 6]), "5, 6");
        let toasts = view.toasts();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].message, "Numbers copied: 5, 6");
    }

    #[tokio::test]
    async fn clear_form_resets_fields() {
        let (mut app, _api, view) = app(StubApi::new());
        app.on_input(0, "9");
        app.clear_form();
        assert!(app.form().user_numbers().is_empty());
        assert_eq!(
            view.events().last(),
            Some(&Event::Field(5, FieldState::Neutral))
        );
    }
}
