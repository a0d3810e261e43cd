//! Terminal front end: one-shot commands against the backend.

mod progress;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use console::style;
use indicatif::ProgressBar;

use crate::app::LottoApp;
use crate::client::{HttpApi, LottoApi, bounded};
use crate::config::AppConfig;
use crate::controller::SubmitOutcome;
use crate::error::{Error, Result};
use crate::numbers::{FIELD_COUNT, FieldState};
use crate::refresh::RefreshOutcome;
use crate::render::{CardView, ExampleView, ModelSectionView, StatsView};
use crate::view::{Toast, ToastLevel, View};

use progress::{
    make_spinner, print_card, print_examples, print_results_header, print_section, print_stats,
};

/// A [`View`] that prints to the terminal.
#[derive(Default)]
pub struct ConsoleView {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleView {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_spinner(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        if let Ok(mut spinner) = self.spinner.lock() {
            f(&mut spinner);
        }
    }

    /// Prints above the spinner, if one is running.
    fn print(&self, f: impl FnOnce()) {
        self.with_spinner(|slot| match slot {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        });
    }
}

impl View for ConsoleView {
    fn set_loading(&self, loading: bool) {
        self.with_spinner(|slot| {
            if loading {
                let spinner = make_spinner();
                spinner.enable_steady_tick(Duration::from_millis(120));
                *slot = Some(spinner);
            } else if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        });
    }

    fn loading_status(&self, text: &str) {
        self.with_spinner(|slot| {
            if let Some(spinner) = slot {
                spinner.set_message(text.to_string());
            }
        });
    }

    fn clear_results(&self) {
        self.print(print_results_header);
    }

    fn append_recommendation(&self, card: &CardView) {
        self.print(|| print_card(card));
    }

    fn append_model_section(&self, section: &ModelSectionView) {
        self.print(|| print_section(section));
    }

    fn show_examples(&self, examples: &ExampleView) {
        self.print(|| print_examples(examples));
    }

    fn show_stats(&self, stats: &StatsView) {
        self.print(|| print_stats(stats));
    }

    fn mark_field(&self, index: usize, state: FieldState) {
        if state == FieldState::Duplicate {
            log::debug!("field {} holds a duplicate", index + 1);
        }
    }

    fn toast(&self, toast: &Toast) {
        let text = match toast.level {
            ToastLevel::Success => style(&toast.message).green(),
            ToastLevel::Info => style(&toast.message).cyan(),
            ToastLevel::Warning => style(&toast.message).yellow(),
            ToastLevel::Error => style(&toast.message).red().bold(),
        };
        self.print(|| eprintln!("{text}"));
    }
}

fn console_app(config: &AppConfig) -> Result<LottoApp> {
    let api = Arc::new(HttpApi::new(&config.client.base_url)?);
    Ok(LottoApp::new(
        api,
        Arc::new(ConsoleView::new()),
        config.client.clone(),
    ))
}

/// `lottopro predict [n...]`: up to six preferred numbers.
///
/// # Errors
///
/// Returns an error if the prediction fails or the numbers repeat.
pub async fn run_predict(config: &AppConfig, numbers: &[String]) -> Result<()> {
    let mut app = console_app(config)?;
    if numbers.len() > FIELD_COUNT {
        log::warn!(
            "only the first {FIELD_COUNT} numbers are used, ignoring {}",
            numbers.len() - FIELD_COUNT
        );
    }
    for (index, raw) in numbers.iter().take(FIELD_COUNT).enumerate() {
        app.on_input(index, raw);
    }

    let outcome = app.on_submit().await;
    app.dispose().await;
    match outcome {
        SubmitOutcome::Rendered(_) | SubmitOutcome::Busy => Ok(()),
        SubmitOutcome::Rejected => Err(Error::Config("duplicate numbers".to_string())),
        SubmitOutcome::Failed(message) => Err(Error::Api(message)),
    }
}

/// `lottopro examples`: one refresh, falling back to local generation.
///
/// # Errors
///
/// Returns an error if the backend URL is invalid.
pub async fn run_examples(config: &AppConfig) -> Result<()> {
    let app = console_app(config)?;
    app.load_stats().await;
    let outcome = app.refresher().refresh().await;
    app.dispose().await;
    if outcome == RefreshOutcome::Cancelled {
        return Err(Error::Cancelled);
    }
    Ok(())
}

/// `lottopro stats`: hot and cold numbers.
///
/// # Errors
///
/// Returns an error if the statistics cannot be loaded.
pub async fn run_stats(config: &AppConfig) -> Result<()> {
    let app = console_app(config)?;
    let stats = app.load_stats().await;
    app.dispose().await;
    stats
        .map(|_| ())
        .ok_or_else(|| Error::Offline("statistics unavailable".to_string()))
}

/// `lottopro health`: backend status and the latest draw.
///
/// # Errors
///
/// Returns an error if the backend cannot be reached.
pub async fn run_health(config: &AppConfig) -> Result<()> {
    let api = HttpApi::new(&config.client.base_url)?;
    let token = tokio_util::sync::CancellationToken::new();
    let health = bounded(config.client.request_timeout, &token, api.health()).await?;

    let flag = |on: bool| if on { style("ok").green() } else { style("off").red() };
    let status = &health.analysis_status;
    println!("Backend:    {}", config.client.base_url);
    println!("Frequency:  {}", flag(status.frequency_analysis));
    println!("Trend:      {}", flag(status.trend_analysis));
    println!("Pattern:    {}", flag(status.pattern_analysis));
    if let Some(source) = &health.data_source {
        println!("Data:       {source}");
    }
    if let Some(round) = &health.latest_round_info {
        let numbers = round
            .numbers
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "Latest:     round {} ({}): {numbers} + {}",
            round.round, round.draw_date, round.bonus
        );
    }
    Ok(())
}
