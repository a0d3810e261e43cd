//! Local example-number generator used when the backend cannot be reached.
//!
//! The output is decorative: it keeps the distribution plausible (spread over
//! low, middle and high numbers, biased toward recently hot numbers when the
//! statistics are known) but carries no statistical meaning.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{ExampleNumbers, MAX_NUMBER, MIN_NUMBER, NumberAnalysis, PICK_COUNT};

/// The three bands a stratified draw takes numbers from.
pub const BANDS: [(u8, u8); 3] = [(1, 15), (16, 30), (31, 45)];

/// Upper bound of hot numbers taken into one fallback draw.
const MAX_HOT_PICKS: usize = 3;

/// Data source reported for locally generated numbers.
pub const LOCAL_SOURCE: &str = "local";

/// Generates six unique sorted numbers in `[1, 45]`.
///
/// When `hot` is non-empty up to three of its in-range members are used
/// first; the rest come from a stratified draw across [`BANDS`].
pub fn generate<R: Rng + ?Sized>(rng: &mut R, hot: &[u8]) -> Vec<u8> {
    let mut numbers: Vec<u8> = Vec::with_capacity(PICK_COUNT);

    let mut candidates: Vec<u8> = hot
        .iter()
        .copied()
        .filter(|n| (MIN_NUMBER..=MAX_NUMBER).contains(n))
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    candidates.shuffle(rng);
    let hot_picks = rng.gen_range(0..=MAX_HOT_PICKS.min(candidates.len()));
    numbers.extend(candidates.into_iter().take(hot_picks));

    // Round-robin over the bands so each gets an even share of what is left.
    let mut band = rng.gen_range(0..BANDS.len());
    while numbers.len() < PICK_COUNT {
        let (low, high) = BANDS[band];
        let pick = rng.gen_range(low..=high);
        if !numbers.contains(&pick) {
            numbers.push(pick);
            band = (band + 1) % BANDS.len();
        }
    }

    numbers.sort_unstable();
    numbers
}

/// Generates a full example set, analysis included.
pub fn generate_examples<R: Rng + ?Sized>(rng: &mut R, hot: &[u8]) -> ExampleNumbers {
    let numbers = generate(rng, hot);
    ExampleNumbers {
        success: true,
        analysis: NumberAnalysis::of(&numbers),
        example_numbers: numbers,
        data_source: Some(LOCAL_SOURCE.to_string()),
        current_round: None,
        next_round: None,
    }
}

/// Returns the band index of `number`, if it is in range.
#[must_use]
pub fn band_of(number: u8) -> Option<usize> {
    BANDS
        .iter()
        .position(|&(low, high)| (low..=high).contains(&number))
}
