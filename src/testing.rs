//! Test doubles shared by the controller tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::LottoApi;
use crate::error::{Error, Result};
use crate::model::{
    ExampleNumbers, HealthResponse, NumberAnalysis, PredictionRequest, PredictionResponse,
    StatsResponse,
};
use crate::numbers::FieldState;
use crate::render::{CardView, ExampleView, ModelSectionView, StatsView};
use crate::view::{Toast, View};

type PredictFn = Box<dyn Fn(&PredictionRequest) -> Result<PredictionResponse> + Send + Sync>;

/// Scriptable backend.
pub struct StubApi {
    delay: Duration,
    predict: PredictFn,
    examples: Mutex<VecDeque<Result<ExampleNumbers>>>,
    stats: Option<StatsResponse>,
    pub predict_calls: AtomicUsize,
    pub example_calls: AtomicUsize,
}

impl StubApi {
    /// A backend whose prediction echoes the user numbers into one top card.
    pub fn new() -> Self {
        Self {
            delay: Duration::ZERO,
            predict: Box::new(|request| {
                let mut numbers = request.user_numbers.clone();
                for n in [10, 20, 30, 40, 41, 42] {
                    if numbers.len() < 6 && !numbers.contains(&n) {
                        numbers.push(n);
                    }
                }
                Ok(PredictionResponse {
                    success: true,
                    top_recommendations: vec![numbers],
                    user_numbers: request.user_numbers.clone(),
                    ..PredictionResponse::default()
                })
            }),
            examples: Mutex::new(VecDeque::new()),
            stats: None,
            predict_calls: AtomicUsize::new(0),
            example_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_predict(
        mut self,
        f: impl Fn(&PredictionRequest) -> Result<PredictionResponse> + Send + Sync + 'static,
    ) -> Self {
        self.predict = Box::new(f);
        self
    }

    pub fn with_stats(mut self, stats: StatsResponse) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Queues the outcome of the next example-number call. Once the queue
    /// is empty every call fails as offline.
    pub fn push_examples(self, result: Result<ExampleNumbers>) -> Self {
        self.examples.lock().unwrap().push_back(result);
        self
    }

    pub fn predict_calls(&self) -> usize {
        self.predict_calls.load(Ordering::SeqCst)
    }

    pub fn example_calls(&self) -> usize {
        self.example_calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// A successful example-number response.
pub fn examples(numbers: [u8; 6]) -> ExampleNumbers {
    ExampleNumbers {
        success: true,
        example_numbers: numbers.to_vec(),
        analysis: NumberAnalysis::of(&numbers),
        data_source: Some("backend".to_string()),
        ..ExampleNumbers::default()
    }
}

#[async_trait]
impl LottoApi for StubApi {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        self.predict_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        (self.predict)(request)
    }

    async fn example_numbers(&self) -> Result<ExampleNumbers> {
        self.example_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.examples
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Offline("stub".to_string())))
    }

    async fn stats(&self) -> Result<StatsResponse> {
        self.stats
            .clone()
            .ok_or_else(|| Error::Offline("stub".to_string()))
    }

    async fn health(&self) -> Result<HealthResponse> {
        Ok(HealthResponse::default())
    }
}

/// Everything a [`RecordingView`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Loading(bool),
    Status(String),
    Clear,
    Card(String, Vec<u8>),
    Section(String),
    Scroll,
    Examples(ExampleView),
    Stats(StatsView),
    Field(usize, FieldState),
    Focus(usize),
    Toast(Toast),
    Share(String),
}

#[derive(Default)]
pub struct RecordingView {
    events: Mutex<Vec<Event>>,
    can_share: bool,
}

impl RecordingView {
    /// A view whose platform supports the share sheet.
    pub fn sharing() -> Self {
        Self {
            can_share: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Toast(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn examples(&self) -> Vec<ExampleView> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Examples(v) => Some(v),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl View for RecordingView {
    fn set_loading(&self, loading: bool) {
        self.push(Event::Loading(loading));
    }

    fn loading_status(&self, text: &str) {
        self.push(Event::Status(text.to_string()));
    }

    fn clear_results(&self) {
        self.push(Event::Clear);
    }

    fn append_recommendation(&self, card: &CardView) {
        self.push(Event::Card(card.label.clone(), card.numbers()));
    }

    fn append_model_section(&self, section: &ModelSectionView) {
        self.push(Event::Section(section.name.clone()));
    }

    fn scroll_to_results(&self) {
        self.push(Event::Scroll);
    }

    fn show_examples(&self, examples: &ExampleView) {
        self.push(Event::Examples(examples.clone()));
    }

    fn show_stats(&self, stats: &StatsView) {
        self.push(Event::Stats(stats.clone()));
    }

    fn mark_field(&self, index: usize, state: FieldState) {
        self.push(Event::Field(index, state));
    }

    fn focus_field(&self, index: usize) {
        self.push(Event::Focus(index));
    }

    fn toast(&self, toast: &Toast) {
        self.push(Event::Toast(toast.clone()));
    }

    fn share(&self, _title: &str, text: &str) -> bool {
        if self.can_share {
            self.push(Event::Share(text.to_string()));
        }
        self.can_share
    }
}
