//! Wire types of the prediction backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Smallest valid lottery number.
pub const MIN_NUMBER: u8 = 1;
/// Largest valid lottery number.
pub const MAX_NUMBER: u8 = 45;
/// Numbers in one draw.
pub const PICK_COUNT: usize = 6;

/// Body of `POST /api/predict`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub user_numbers: Vec<u8>,
}

/// One model's output as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResult {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub predictions: Vec<Vec<u8>>,
}

/// Model results in the order the backend sent them.
///
/// JSON objects are unordered in general, but the backend emits its models
/// in a meaningful order and the results are rendered in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Models(pub Vec<(String, ModelResult)>);

impl Models {
    /// Iterates `(name, result)` pairs in backend order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelResult)> {
        self.0.iter().map(|(name, result)| (name.as_str(), result))
    }

    /// Looks up a model by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModelResult> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, r)| r)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Models {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ModelsVisitor;

        impl<'de> Visitor<'de> for ModelsVisitor {
            type Value = Models;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of model name to model result")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Models, A::Error> {
                let mut models = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, result)) = map.next_entry::<String, ModelResult>()? {
                    models.push((name, result));
                }
                Ok(Models(models))
            }
        }

        deserializer.deserialize_map(ModelsVisitor)
    }
}

impl Serialize for Models {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, result) in &self.0 {
            map.serialize_entry(name, result)?;
        }
        map.end()
    }
}

/// Response of `POST /api/predict`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionResponse {
    pub success: bool,
    pub top_recommendations: Vec<Vec<u8>>,
    pub models: Models,
    pub user_numbers: Vec<u8>,
    pub data_source: Option<String>,
    pub current_round: Option<u32>,
    pub next_round: Option<u32>,
    pub analysis_applied: Option<bool>,
    pub total_combinations: Option<u32>,
    pub error: Option<String>,
}

/// Sum and parity of an example draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberAnalysis {
    pub sum: u32,
    pub even_count: u32,
    pub odd_count: u32,
}

impl NumberAnalysis {
    /// Computes the analysis of a number set.
    #[must_use]
    pub fn of(numbers: &[u8]) -> Self {
        let sum = numbers.iter().map(|&n| u32::from(n)).sum();
        let even_count = numbers.iter().filter(|&&n| n % 2 == 0).count();
        let even_count = u32::try_from(even_count).unwrap_or(u32::MAX);
        let total = u32::try_from(numbers.len()).unwrap_or(u32::MAX);
        Self {
            sum,
            even_count,
            odd_count: total - even_count,
        }
    }
}

/// Response of `GET /api/example-numbers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExampleNumbers {
    pub success: bool,
    pub example_numbers: Vec<u8>,
    pub analysis: NumberAnalysis,
    pub data_source: Option<String>,
    pub current_round: Option<u32>,
    pub next_round: Option<u32>,
}

/// Status flags of the backend's analyses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisStatus {
    pub frequency_analysis: bool,
    pub trend_analysis: bool,
    pub pattern_analysis: bool,
}

/// Response of `GET /api/stats`.
///
/// Hot and cold numbers are `[number, frequency]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsResponse {
    pub hot_numbers: Vec<(u8, u32)>,
    pub cold_numbers: Vec<(u8, u32)>,
    pub analysis_status: Option<AnalysisStatus>,
    pub current_round: Option<u32>,
    pub next_round: Option<u32>,
    pub total_draws: Option<u32>,
    /// Draw count of every number over the whole history.
    pub frequency: Option<BTreeMap<u8, u32>>,
}

impl StatsResponse {
    /// Hot numbers without their frequencies, hottest first.
    #[must_use]
    pub fn hot(&self) -> Vec<u8> {
        self.hot_numbers.iter().map(|&(n, _)| n).collect()
    }
}

/// Latest draw as reported by `GET /api/health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundInfo {
    pub round: u32,
    pub draw_date: String,
    pub numbers: Vec<u8>,
    pub bonus: u8,
}

/// Response of `GET /api/health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthResponse {
    pub analysis_status: AnalysisStatus,
    pub latest_round_info: Option<RoundInfo>,
    pub sample_data_count: Option<u32>,
    pub data_source: Option<String>,
}
