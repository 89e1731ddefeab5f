//! Column format inference.
//!
//! Each detector evaluates a whole sample against its candidate formats and
//! reports the best one with a mismatch count; [`guess_column`] applies the
//! priority order and the confidence policy.

mod boolean;
mod date;
mod engine;
mod numeric;
mod options;
mod patterns;
mod value_format;

pub use date::{DatePattern, DateToken, TimeFormat};
pub use engine::{guess_column, guess_values, link_date_parts};
pub use options::{DatePreference, DetectionOptions, FormatHints};
pub use value_format::{DataType, GuessResult, ValueFormat};

/// How well one candidate format fits a sample.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Evaluation {
    pub format: ValueFormat,
    pub mismatches: usize,
    pub example_non_match: Option<String>,
    /// The format came from a caller-supplied hint.
    pub hinted: bool,
}

impl Evaluation {
    /// Count the values `matches` rejects, keeping the first as an example.
    pub fn count<'a>(
        values: &[&'a str],
        format: ValueFormat,
        mut matches: impl FnMut(&'a str) -> bool,
    ) -> Self {
        let mut mismatches = 0;
        let mut example_non_match = None;
        for &value in values {
            if !matches(value) {
                mismatches += 1;
                example_non_match.get_or_insert_with(|| value.to_string());
            }
        }
        Self {
            format,
            mismatches,
            example_non_match,
            hinted: false,
        }
    }

    /// The better of two evaluations: fewer mismatches, then the earlier one.
    pub fn better(self, other: Self) -> Self {
        if other.mismatches < self.mismatches {
            other
        } else {
            self
        }
    }
}
