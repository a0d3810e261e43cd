//! Pure mapping from backend responses to view models.

use serde::Serialize;

use crate::model::{ExampleNumbers, ModelResult, PredictionResponse, StatsResponse};

/// Cards shown per model section.
pub const MODEL_CARD_LIMIT: usize = 5;
/// Hot and cold numbers shown in the statistics panel.
pub const STATS_LIMIT: usize = 8;

/// Colour band of a ball, by tens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BallColor {
    /// 1–10
    Yellow,
    /// 11–20
    Blue,
    /// 21–30
    Red,
    /// 31–40
    Gray,
    /// 41–45
    Green,
}

impl BallColor {
    #[must_use]
    pub const fn of(number: u8) -> Self {
        match number {
            0..=10 => Self::Yellow,
            11..=20 => Self::Blue,
            21..=30 => Self::Red,
            31..=40 => Self::Gray,
            _ => Self::Green,
        }
    }

    /// CSS class of the band.
    #[must_use]
    pub const fn class(self) -> &'static str {
        match self {
            Self::Yellow => "lotto-ball-1",
            Self::Blue => "lotto-ball-2",
            Self::Red => "lotto-ball-3",
            Self::Gray => "lotto-ball-4",
            Self::Green => "lotto-ball-5",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BallView {
    pub number: u8,
    pub color: BallColor,
    pub user_selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub label: String,
    pub balls: Vec<BallView>,
    /// Whether a "your numbers" legend is shown.
    pub show_legend: bool,
    pub top_pick: bool,
}

impl CardView {
    /// Numbers on the card, in display order.
    #[must_use]
    pub fn numbers(&self) -> Vec<u8> {
        self.balls.iter().map(|b| b.number).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSectionView {
    pub name: String,
    pub description: String,
    pub cards: Vec<CardView>,
    /// All predictions the model produced, not only the shown ones.
    pub total_combinations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PredictionView {
    pub top: Vec<CardView>,
    pub models: Vec<ModelSectionView>,
    pub user_numbers: Vec<u8>,
    pub data_source: Option<String>,
    pub next_round: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleView {
    pub balls: Vec<BallView>,
    pub sum: u32,
    pub even_count: u32,
    pub odd_count: u32,
    /// True when the numbers came from the local generator.
    pub local: bool,
    pub data_source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyView {
    pub number: u8,
    pub frequency: u32,
    pub color: BallColor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsView {
    pub hot: Vec<FrequencyView>,
    pub cold: Vec<FrequencyView>,
}

fn balls(numbers: &[u8], user_numbers: &[u8]) -> Vec<BallView> {
    numbers
        .iter()
        .map(|&number| BallView {
            number,
            color: BallColor::of(number),
            user_selected: user_numbers.contains(&number),
        })
        .collect()
}

/// Builds one recommendation card.
#[must_use]
pub fn card(numbers: &[u8], label: String, user_numbers: &[u8], top_pick: bool) -> CardView {
    CardView {
        label,
        balls: balls(numbers, user_numbers),
        show_legend: !user_numbers.is_empty(),
        top_pick,
    }
}

fn model_section(name: &str, result: &ModelResult, user_numbers: &[u8]) -> ModelSectionView {
    ModelSectionView {
        name: name.to_string(),
        description: result.description.clone(),
        cards: result
            .predictions
            .iter()
            .take(MODEL_CARD_LIMIT)
            .enumerate()
            .map(|(i, numbers)| card(numbers, format!("{}", i + 1), user_numbers, false))
            .collect(),
        total_combinations: result.predictions.len(),
    }
}

/// Maps a successful prediction to its view model.
///
/// Top recommendations come first, then model sections in the order the
/// backend listed them.
#[must_use]
pub fn render_prediction(response: &PredictionResponse) -> PredictionView {
    let user_numbers = &response.user_numbers;
    PredictionView {
        top: response
            .top_recommendations
            .iter()
            .enumerate()
            .map(|(i, numbers)| card(numbers, format!("TOP {}", i + 1), user_numbers, true))
            .collect(),
        models: response
            .models
            .iter()
            .map(|(name, result)| model_section(name, result, user_numbers))
            .collect(),
        user_numbers: user_numbers.clone(),
        data_source: response.data_source.clone(),
        next_round: response.next_round,
    }
}

/// Maps example numbers to their view model.
#[must_use]
pub fn render_examples(examples: &ExampleNumbers) -> ExampleView {
    ExampleView {
        balls: balls(&examples.example_numbers, &[]),
        sum: examples.analysis.sum,
        even_count: examples.analysis.even_count,
        odd_count: examples.analysis.odd_count,
        local: examples.data_source.as_deref() == Some(crate::generator::LOCAL_SOURCE),
        data_source: examples.data_source.clone(),
    }
}

fn frequencies(pairs: &[(u8, u32)]) -> Vec<FrequencyView> {
    pairs
        .iter()
        .take(STATS_LIMIT)
        .map(|&(number, frequency)| FrequencyView {
            number,
            frequency,
            color: BallColor::of(number),
        })
        .collect()
}

/// Maps statistics to the hot/cold panel.
#[must_use]
pub fn render_stats(stats: &StatsResponse) -> StatsView {
    StatsView {
        hot: frequencies(&stats.hot_numbers),
        cold: frequencies(&stats.cold_numbers),
    }
}

/// Text put on the clipboard by the copy button.
#[must_use]
pub fn copy_text(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Title of the share sheet.
pub const SHARE_TITLE: &str = "LottoPro AI recommended numbers";

/// Text handed to the platform share sheet.
#[must_use]
pub fn share_text(numbers: &[u8]) -> String {
    format!("{SHARE_TITLE}: {}", copy_text(numbers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Models, NumberAnalysis};

    fn response() -> PredictionResponse {
        PredictionResponse {
            success: true,
            top_recommendations: vec![vec![1, 2, 3, 10, 20, 30]],
            models: Models(vec![
                (
                    "Frequency".to_string(),
                    ModelResult {
                        description: "freq".to_string(),
                        predictions: (1..=8).map(|i| vec![i, 11, 21, 31, 41, 45]).collect(),
                    },
                ),
                (
                    "Trend".to_string(),
                    ModelResult {
                        description: "trend".to_string(),
                        predictions: vec![vec![4, 5, 6, 7, 8, 9]],
                    },
                ),
            ]),
            user_numbers: vec![1, 2, 3],
            ..PredictionResponse::default()
        }
    }

    #[test]
    fn top_card_flags_user_numbers() {
        let view = render_prediction(&response());
        let top = &view.top[0];
        assert_eq!(top.label, "TOP 1");
        assert_eq!(top.numbers(), vec![1, 2, 3, 10, 20, 30]);
        let flagged: Vec<u8> = top
            .balls
            .iter()
            .filter(|b| b.user_selected)
            .map(|b| b.number)
            .collect();
        assert_eq!(flagged, vec![1, 2, 3]);
        assert!(top.show_legend);
        assert!(top.top_pick);
    }

    #[test]
    fn model_sections_keep_order_and_limit_cards() {
        let view = render_prediction(&response());
        let names: Vec<_> = view.models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Frequency", "Trend"]);
        assert_eq!(view.models[0].cards.len(), MODEL_CARD_LIMIT);
        assert_eq!(view.models[0].total_combinations, 8);
        assert_eq!(view.models[0].cards[4].label, "5");
        assert!(!view.models[0].cards[0].top_pick);
    }

    #[test]
    fn no_user_numbers_means_no_legend() {
        let mut response = response();
        response.user_numbers.clear();
        let view = render_prediction(&response);
        assert!(!view.top[0].show_legend);
        assert!(view.top[0].balls.iter().all(|b| !b.user_selected));
    }

    #[test]
    fn ball_colors_by_tens() {
        assert_eq!(BallColor::of(1), BallColor::Yellow);
        assert_eq!(BallColor::of(10), BallColor::Yellow);
        assert_eq!(BallColor::of(11), BallColor::Blue);
        assert_eq!(BallColor::of(30), BallColor::Red);
        assert_eq!(BallColor::of(40), BallColor::Gray);
        assert_eq!(BallColor::of(45).class(), "lotto-ball-5");
    }

    #[test]
    fn stats_show_first_eight() {
        let stats = StatsResponse {
            hot_numbers: (1..=10).map(|n| (n, 20 - u32::from(n))).collect(),
            cold_numbers: vec![(44, 1)],
            ..StatsResponse::default()
        };
        let view = render_stats(&stats);
        assert_eq!(view.hot.len(), STATS_LIMIT);
        assert_eq!(view.hot[0].number, 1);
        assert_eq!(view.hot[0].frequency, 19);
        assert_eq!(view.cold.len(), 1);
    }

    #[test]
    fn examples_view_marks_local_source() {
        let examples = ExampleNumbers {
            success: true,
            example_numbers: vec![2, 9, 17, 25, 33, 41],
            analysis: NumberAnalysis::of(&[2, 9, 17, 25, 33, 41]),
            data_source: Some("local".to_string()),
            ..ExampleNumbers::default()
        };
        let view = render_examples(&examples);
        assert!(view.local);
        assert_eq!(view.sum, 127);
        assert_eq!(view.balls.len(), 6);
    }

    #[test]
    fn copy_and_share_text() {
        assert_eq!(copy_text(&[1, 2, 3]), "1, 2, 3");
        assert!(share_text(&[7]).ends_with(": 7"));
    }
}
