//! Priority order and confidence policy.

use foldhash::HashSet;
use tracing::debug;

use super::Evaluation;
use super::options::{DetectionOptions, FormatHints};
use super::patterns::{GUID_PATTERN, IDENTIFIER_NAME_PATTERN, INTEGER_PATTERN};
use super::value_format::{GuessResult, ValueFormat};
use super::{boolean, date, numeric};
use crate::error::{Result, SieveError};
use crate::sampler::ColumnSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detector {
    Boolean,
    Guid,
    Identifier,
    Numeric,
    DateTime,
}

impl Detector {
    /// First confident match wins.
    const ORDER: [Detector; 5] = [
        Detector::Boolean,
        Detector::Guid,
        Detector::Identifier,
        Detector::Numeric,
        Detector::DateTime,
    ];

    /// Structural formats are not subject to the minimum distinct count.
    fn is_structural(&self) -> bool {
        matches!(self, Detector::Boolean | Detector::Guid)
    }
}

/// Infer the format of a sampled column.
///
/// Fails with [`SieveError::NoSamples`] when the sample holds no non-empty
/// value. Every other outcome, including "text", is a [`GuessResult`].
pub fn guess_column(
    sample: &ColumnSample,
    options: &DetectionOptions,
    hints: &FormatHints,
) -> Result<GuessResult> {
    guess_values(&sample.name, &sample.values, options, hints)
}

/// Infer the format of a column from raw values.
///
/// Values are trimmed and empty values are ignored.
///
/// # Example
///
/// ```
/// use csv_sieve::{guess_values, DataType, DetectionOptions, FormatHints};
///
/// let values = ["1", "2.5", "3", "4", "5.3"];
/// let guess = guess_values("amount", &values, &DetectionOptions::default(), &FormatHints::default())
///     .unwrap();
/// let format = guess.format.unwrap();
/// assert_eq!(format.data_type, DataType::Numeric);
/// assert_eq!(format.decimal_separator, Some('.'));
/// ```
pub fn guess_values<S: AsRef<str>>(
    name: &str,
    values: &[S],
    options: &DetectionOptions,
    hints: &FormatHints,
) -> Result<GuessResult> {
    let values: Vec<&str> = values
        .iter()
        .map(|v| v.as_ref().trim())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        return Err(SieveError::NoSamples);
    }

    let distinct = values.iter().collect::<HashSet<_>>().len();
    let allowed = options.allowed_mismatches(values.len());
    let mut partial: Option<Evaluation> = None;

    for detector in Detector::ORDER {
        let evaluation = match detector {
            Detector::Boolean if options.boolean => boolean::evaluate(&values, hints),
            Detector::Guid if options.guid => Some(Evaluation::count(
                &values,
                ValueFormat::guid(),
                |v| GUID_PATTERN.is_match(v),
            )),
            Detector::Identifier if options.ignore_id_columns => {
                if looks_like_identifier(name, &values, distinct) {
                    debug!(column = name, "identifier column left unconverted");
                    return Ok(GuessResult {
                        not_converted: true,
                        ..GuessResult::text()
                    });
                }
                None
            }
            Detector::Numeric if options.numeric => {
                numeric::evaluate(&values, hints, options.percentage)
            }
            Detector::DateTime if options.date_time => date::evaluate(&values, hints),
            _ => None,
        };
        let Some(evaluation) = evaluation else {
            continue;
        };

        if evaluation.mismatches == 0 {
            if detector.is_structural() || evaluation.hinted || distinct >= options.min_distinct
            {
                debug!(column = name, format = %evaluation.format, "format detected");
                return Ok(GuessResult::confident(evaluation.format));
            }
            debug!(
                column = name,
                distinct,
                candidate = %evaluation.format,
                "too few distinct values to decide"
            );
            return Ok(GuessResult {
                insufficient_evidence: true,
                candidate: Some(evaluation.format),
                ..GuessResult::default()
            });
        }
        if evaluation.mismatches <= allowed && partial.is_none() {
            partial = Some(evaluation);
        }
    }

    Ok(match partial {
        Some(evaluation) => {
            debug!(
                column = name,
                candidate = %evaluation.format,
                mismatches = evaluation.mismatches,
                "possible match"
            );
            GuessResult {
                possible_match: true,
                candidate: Some(evaluation.format),
                mismatches: evaluation.mismatches,
                example_non_match: evaluation.example_non_match,
                ..GuessResult::default()
            }
        }
        None => GuessResult::text(),
    })
}

/// Identifier-like name and unique integer values.
fn looks_like_identifier(name: &str, values: &[&str], distinct: usize) -> bool {
    IDENTIFIER_NAME_PATTERN.is_match(name.trim())
        && distinct == values.len()
        && values.iter().all(|v| INTEGER_PATTERN.is_match(v))
}

/// Pair date-only columns with time-only columns named alike ("Start Date" /
/// "Start Time", "OrderDate" / "OrderTime").
///
/// The date column's format takes over the time format and records the time
/// column's name in [`ValueFormat::time_part`]. Returns the number of pairs
/// linked.
pub fn link_date_parts<S: AsRef<str>>(names: &[S], results: &mut [GuessResult]) -> usize {
    let count = names.len().min(results.len());
    let mut linked = 0;

    for i in 0..count {
        if !results[i].format.as_ref().is_some_and(ValueFormat::is_date_only) {
            continue;
        }
        let Some(stem) = strip_word(names[i].as_ref(), "date") else {
            continue;
        };
        let partner = (0..count).find(|&j| {
            j != i
                && results[j].format.as_ref().is_some_and(ValueFormat::is_time_only)
                && strip_word(names[j].as_ref(), "time").as_deref() == Some(stem.as_str())
        });
        let Some(j) = partner else {
            continue;
        };

        let time_format = results[j]
            .format
            .as_ref()
            .and_then(|f| f.time_format.clone());
        let time_part = names[j].as_ref().to_string();
        if let Some(format) = results[i].format.as_mut() {
            debug!(date = names[i].as_ref(), time = %time_part, "linked date and time columns");
            format.time_format = time_format;
            format.time_part = Some(time_part);
            linked += 1;
        }
    }
    linked
}

/// Lowercased `name` without its last occurrence of `word` and without
/// surrounding separators; `None` if the word is absent.
fn strip_word(name: &str, word: &str) -> Option<String> {
    let lower = name.to_lowercase();
    let at = lower.rfind(word)?;
    let stem = format!("{}{}", &lower[..at], &lower[at + word.len()..]);
    Some(
        stem.trim_matches(|c: char| matches!(c, ' ' | '_' | '-' | '.'))
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::value_format::DataType;

    fn guess(values: &[&str]) -> GuessResult {
        guess_values(
            "column",
            values,
            &DetectionOptions::default(),
            &FormatHints::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_integer() {
        let result = guess(&["1", "2", "3", "4", "5"]);
        assert_eq!(result.data_type(), DataType::Integer);
        assert!(!result.possible_match);
    }

    #[test]
    fn test_numeric_with_point() {
        let result = guess(&["1", "2.5", "3", "4", "5.3"]);
        let format = result.format.unwrap();
        assert_eq!(format.data_type, DataType::Numeric);
        assert_eq!(format.decimal_separator, Some('.'));
    }

    #[test]
    fn test_boolean_before_numeric() {
        let result = guess(&["1", "0", "0", "1"]);
        let format = result.format.unwrap();
        assert_eq!(format.data_type, DataType::Boolean);
        assert_eq!(format.true_literal.as_deref(), Some("1"));
    }

    #[test]
    fn test_guid() {
        let result = guess(&[
            "3f2504e0-4f89-11d3-9a0c-0305e82c3301",
            "{6F9619FF-8B86-D011-B42D-00C04FC964FF}",
        ]);
        assert_eq!(result.data_type(), DataType::Guid);
    }

    #[test]
    fn test_empty_sample_is_error() {
        let err = guess_values::<&str>(
            "x",
            &[],
            &DetectionOptions::default(),
            &FormatHints::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SieveError::NoSamples));

        let err = guess_values(
            "x",
            &["", "  "],
            &DetectionOptions::default(),
            &FormatHints::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SieveError::NoSamples));
    }

    #[test]
    fn test_insufficient_evidence() {
        let result = guess(&["01/02/2010", "02/12/2012"]);
        assert!(!result.possible_match);
        assert!(result.insufficient_evidence);
        assert!(result.format.is_none());
        assert_eq!(result.candidate.unwrap().data_type, DataType::DateTime);
    }

    #[test]
    fn test_hinted_date_overrides_min_distinct() {
        let hints = FormatHints {
            date_format: Some("dd/MM/yyyy".into()),
            ..FormatHints::default()
        };
        let result =
            guess_values("d", &["01/02/2010", "02/12/2012"], &DetectionOptions::default(), &hints)
                .unwrap();
        assert_eq!(result.data_type(), DataType::DateTime);
    }

    #[test]
    fn test_possible_match_within_tolerance() {
        let mut values: Vec<String> = (1..=19).map(|i| i.to_string()).collect();
        values.push("n/a".to_string());
        let result = guess_values(
            "count",
            &values,
            &DetectionOptions::default(),
            &FormatHints::default(),
        )
        .unwrap();
        assert!(result.format.is_none());
        assert!(result.possible_match);
        assert_eq!(result.mismatches, 1);
        assert_eq!(result.example_non_match.as_deref(), Some("n/a"));
        assert_eq!(result.candidate.unwrap().data_type, DataType::Integer);
    }

    #[test]
    fn test_text_fallback() {
        let result = guess(&["apple", "pear", "plum", "7"]);
        assert_eq!(result.data_type(), DataType::String);
        assert!(result.is_confident());
        assert!(!result.possible_match);
    }

    #[test]
    fn test_identifier_suppression() {
        let options = DetectionOptions {
            ignore_id_columns: true,
            ..DetectionOptions::default()
        };
        let values = ["17", "18", "25", "40"];
        let result = guess_values("CustomerID", &values, &options, &FormatHints::default()).unwrap();
        assert!(result.not_converted);
        assert_eq!(result.data_type(), DataType::String);

        let result = guess_values("amount", &values, &options, &FormatHints::default()).unwrap();
        assert_eq!(result.data_type(), DataType::Integer);
    }

    #[test]
    fn test_disabled_detectors() {
        let options = DetectionOptions {
            numeric: false,
            ..DetectionOptions::default()
        };
        let result = guess_values("n", &["1", "2", "3"], &options, &FormatHints::default()).unwrap();
        assert_eq!(result.data_type(), DataType::String);
    }

    #[test]
    fn test_link_date_parts() {
        let names = ["Start Date", "Start Time", "Note"];
        let mut results = vec![
            guess(&["2024-01-02", "2024-01-03", "2024-01-04"]),
            guess(&["08:00", "09:30", "10:15"]),
            guess(&["a", "b", "c"]),
        ];
        assert_eq!(link_date_parts(&names, &mut results), 1);
        let date = results[0].format.as_ref().unwrap();
        assert_eq!(date.time_part.as_deref(), Some("Start Time"));
        assert_eq!(date.time_format.as_deref(), Some("HH:mm"));
        assert!(results[1].format.as_ref().unwrap().is_time_only());
    }

    #[test]
    fn test_strip_word() {
        assert_eq!(strip_word("OrderDate", "date").as_deref(), Some("order"));
        assert_eq!(strip_word("order_time", "time").as_deref(), Some("order"));
        assert_eq!(strip_word("Name", "date"), None);
    }
}
