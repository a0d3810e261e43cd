//! The presentation adapter the controller drives.

use crate::numbers::FieldState;
use crate::render::{CardView, ExampleView, ModelSectionView, StatsView};

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn new(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Receives every UI update the controller produces.
///
/// Implement this trait to put results on a screen. All methods have
/// default no-op implementations for convenience.
pub trait View: Send + Sync {
    /// Called when a prediction starts (`true`) and ends (`false`).
    fn set_loading(&self, _loading: bool) {}

    /// Called by the loading ticker with the next status line.
    fn loading_status(&self, _text: &str) {}

    /// Called before a new set of results is revealed.
    fn clear_results(&self) {}

    /// Called for each top recommendation, in order.
    fn append_recommendation(&self, _card: &CardView) {}

    /// Called for each model section after all top recommendations.
    fn append_model_section(&self, _section: &ModelSectionView) {}

    /// Called once results are fully revealed, after the scroll delay.
    fn scroll_to_results(&self) {}

    /// Called with a fresh example-number set.
    fn show_examples(&self, _examples: &ExampleView) {}

    /// Called with hot/cold statistics.
    fn show_stats(&self, _stats: &StatsView) {}

    /// Called when a field's validation state changes.
    fn mark_field(&self, _index: usize, _state: FieldState) {}

    /// Called to move focus to another field.
    fn focus_field(&self, _index: usize) {}

    /// Called to show a notification.
    fn toast(&self, _toast: &Toast) {}

    /// Hands `text` to the platform share sheet; returns `false` when
    /// sharing is not available.
    fn share(&self, _title: &str, _text: &str) -> bool {
        false
    }
}

/// A view that ignores all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoView;

impl View for NoView {}

/// A view that reports updates through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogView;

impl View for LogView {
    fn set_loading(&self, loading: bool) {
        log::debug!("loading: {loading}");
    }

    fn append_recommendation(&self, card: &CardView) {
        log::info!("{}: {:?}", card.label, card.numbers());
    }

    fn append_model_section(&self, section: &ModelSectionView) {
        log::info!(
            "{} ({} combinations): {:?}",
            section.name,
            section.total_combinations,
            section.cards.iter().map(CardView::numbers).collect::<Vec<_>>()
        );
    }

    fn show_examples(&self, examples: &ExampleView) {
        let numbers: Vec<u8> = examples.balls.iter().map(|b| b.number).collect();
        log::info!(
            "Example numbers {numbers:?} (sum {}, {} even / {} odd{})",
            examples.sum,
            examples.even_count,
            examples.odd_count,
            if examples.local { ", generated locally" } else { "" }
        );
    }

    fn toast(&self, toast: &Toast) {
        match toast.level {
            ToastLevel::Error => log::error!("{}", toast.message),
            ToastLevel::Warning => log::warn!("{}", toast.message),
            ToastLevel::Info | ToastLevel::Success => log::info!("{}", toast.message),
        }
    }
}
