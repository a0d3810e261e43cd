//! The six-field number form: clamping, duplicate detection and key handling.

use crate::model::{MAX_NUMBER, MIN_NUMBER, PredictionRequest};

/// Number of input fields on the form.
pub const FIELD_COUNT: usize = 6;

/// Visual state of one input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldState {
    /// Empty or non-numeric; no state class.
    #[default]
    Neutral,
    /// Holds an in-range, unique value.
    Valid,
    /// Holds a value another filled field also holds.
    Duplicate,
}

/// What the form asks the view to do after an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFeedback {
    /// Text to write back into the field (the clamped value).
    pub value: String,
    /// New state of the edited field.
    pub state: FieldState,
    /// Whether a duplicate warning toast should be shown.
    pub warn_duplicate: bool,
}

/// Result of pressing Enter in a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Move focus to the field with this index.
    Focus(usize),
    /// Submit the form.
    Submit,
}

/// Clamps any integer into `[MIN_NUMBER, MAX_NUMBER]`.
#[must_use]
pub fn clamp_number(value: i64) -> u8 {
    let clamped = value.clamp(i64::from(MIN_NUMBER), i64::from(MAX_NUMBER));
    u8::try_from(clamped).unwrap_or(MAX_NUMBER)
}

/// Parses the leading integer of `raw`, ignoring surrounding whitespace.
///
/// `"12abc"` parses as 12 and `"-5"` as -5; text with no leading digits
/// yields `None`.
#[must_use]
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Anything too long for i64 is far outside the range anyway.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(sign * magnitude)
}

/// The number entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberForm {
    fields: [String; FIELD_COUNT],
}

impl NumberForm {
    /// Creates an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a form with the given raw field contents.
    #[must_use]
    pub fn from_fields(fields: [&str; FIELD_COUNT]) -> Self {
        Self {
            fields: fields.map(String::from),
        }
    }

    /// Raw text of one field.
    #[must_use]
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map_or("", String::as_str)
    }

    /// Parsed value of a field, if it holds a number.
    fn value(&self, index: usize) -> Option<i64> {
        parse_leading_int(self.field(index))
    }

    fn is_filled(&self, index: usize) -> bool {
        !self.field(index).trim().is_empty()
    }

    /// Handles a keystroke in `index`, clamping the value into range.
    ///
    /// Out-of-range indices are ignored and report a neutral field.
    pub fn input(&mut self, index: usize, raw: &str) -> InputFeedback {
        let Some(slot) = self.fields.get_mut(index) else {
            return InputFeedback {
                value: raw.to_string(),
                state: FieldState::Neutral,
                warn_duplicate: false,
            };
        };
        let Some(parsed) = parse_leading_int(raw) else {
            raw.clone_into(slot);
            return InputFeedback {
                value: raw.to_string(),
                state: FieldState::Neutral,
                warn_duplicate: false,
            };
        };
        *slot = clamp_number(parsed).to_string();
        let state = self.field_state(index);
        InputFeedback {
            value: self.fields[index].clone(),
            state,
            warn_duplicate: state == FieldState::Duplicate,
        }
    }

    /// Re-checks one field when it loses focus.
    #[must_use]
    pub fn blur(&self, index: usize) -> InputFeedback {
        let state = self.field_state(index);
        InputFeedback {
            value: self.field(index).to_string(),
            state,
            warn_duplicate: state == FieldState::Duplicate,
        }
    }

    /// Handles Enter: advance to the next field, or submit from the last one.
    #[must_use]
    pub const fn enter(index: usize) -> KeyAction {
        if index + 1 < FIELD_COUNT {
            KeyAction::Focus(index + 1)
        } else {
            KeyAction::Submit
        }
    }

    /// Current state of one field.
    #[must_use]
    pub fn field_state(&self, index: usize) -> FieldState {
        match self.value(index) {
            None => FieldState::Neutral,
            Some(_) if self.duplicate_fields()[index] => FieldState::Duplicate,
            Some(_) => FieldState::Valid,
        }
    }

    /// States of all fields.
    #[must_use]
    pub fn field_states(&self) -> [FieldState; FIELD_COUNT] {
        std::array::from_fn(|i| self.field_state(i))
    }

    /// Flags every filled field whose value also appears in another filled
    /// field. Empty fields are never flagged.
    #[must_use]
    pub fn duplicate_fields(&self) -> [bool; FIELD_COUNT] {
        let values: [Option<i64>; FIELD_COUNT] = std::array::from_fn(|i| {
            if self.is_filled(i) {
                self.value(i)
            } else {
                None
            }
        });
        std::array::from_fn(|i| {
            values[i].is_some_and(|v| {
                values
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && *other == Some(v))
            })
        })
    }

    /// True if any two filled fields share a value.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.duplicate_fields().iter().any(|&d| d)
    }

    /// Unique in-range numbers in field order, first occurrence winning.
    #[must_use]
    pub fn user_numbers(&self) -> Vec<u8> {
        let mut numbers = Vec::with_capacity(FIELD_COUNT);
        for index in 0..FIELD_COUNT {
            let Some(value) = self.value(index) else {
                continue;
            };
            if !(i64::from(MIN_NUMBER)..=i64::from(MAX_NUMBER)).contains(&value) {
                continue;
            }
            let number = clamp_number(value);
            if !numbers.contains(&number) {
                numbers.push(number);
            }
        }
        numbers
    }

    /// Builds the request body for the current form contents.
    #[must_use]
    pub fn to_request(&self) -> PredictionRequest {
        PredictionRequest {
            user_numbers: self.user_numbers(),
        }
    }

    /// Empties every field.
    pub fn clear(&mut self) {
        self.fields = Default::default();
    }
}
