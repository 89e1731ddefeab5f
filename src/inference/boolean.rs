//! Boolean literal pairs.

use super::Evaluation;
use super::options::FormatHints;
use super::value_format::ValueFormat;

/// True/false pairs recognized without hints, compared case-insensitively.
const LITERAL_PAIRS: &[(&str, &str)] = &[
    ("true", "false"),
    ("yes", "no"),
    ("1", "0"),
    ("y", "n"),
    ("t", "f"),
    ("on", "off"),
];

/// Evaluate the sample against every known literal pair and return the pair
/// with the fewest mismatches. Caller-supplied literals are tried first and
/// win ties.
pub(crate) fn evaluate(values: &[&str], hints: &FormatHints) -> Option<Evaluation> {
    let hinted = match (&hints.true_literal, &hints.false_literal) {
        (Some(t), Some(f)) => Some((t.as_str(), f.as_str())),
        _ => None,
    };

    hinted
        .into_iter()
        .chain(LITERAL_PAIRS.iter().copied())
        .map(|pair| evaluate_pair(values, pair))
        .reduce(Evaluation::better)
        .map(|evaluation| Evaluation {
            hinted: hinted.is_some_and(|pair| same_pair(&evaluation.format, pair)),
            ..evaluation
        })
}

fn evaluate_pair(values: &[&str], (t, f): (&str, &str)) -> Evaluation {
    let mut found_true = None;
    let mut found_false = None;

    let evaluation = Evaluation::count(values, ValueFormat::default(), |value| {
        if value.eq_ignore_ascii_case(t) {
            found_true.get_or_insert(value);
            true
        } else if value.eq_ignore_ascii_case(f) {
            found_false.get_or_insert(value);
            true
        } else {
            false
        }
    });

    // Keep the spelling the data actually uses.
    Evaluation {
        format: ValueFormat::boolean(found_true.unwrap_or(t), found_false.unwrap_or(f)),
        ..evaluation
    }
}

fn same_pair(format: &ValueFormat, (t, f): (&str, &str)) -> bool {
    format
        .true_literal
        .as_deref()
        .is_some_and(|x| x.eq_ignore_ascii_case(t))
        && format
            .false_literal
            .as_deref()
            .is_some_and(|x| x.eq_ignore_ascii_case(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pair_found_in_data() {
        let evaluation = evaluate(&["Yes", "No", "yes", "YES"], &FormatHints::default()).unwrap();
        assert_eq!(evaluation.mismatches, 0);
        assert_eq!(evaluation.format.true_literal.as_deref(), Some("Yes"));
        assert_eq!(evaluation.format.false_literal.as_deref(), Some("No"));
    }

    #[test]
    fn test_one_sided_column() {
        let evaluation = evaluate(&["TRUE", "true"], &FormatHints::default()).unwrap();
        assert_eq!(evaluation.mismatches, 0);
        assert_eq!(evaluation.format.false_literal.as_deref(), Some("false"));
    }

    #[test]
    fn test_hinted_literals() {
        let hints = FormatHints {
            true_literal: Some("Ja".into()),
            false_literal: Some("Nein".into()),
            ..FormatHints::default()
        };
        let evaluation = evaluate(&["ja", "nein", "Nein"], &hints).unwrap();
        assert_eq!(evaluation.mismatches, 0);
        assert!(evaluation.hinted);
        assert_eq!(evaluation.format.true_literal.as_deref(), Some("ja"));
    }

    #[test]
    fn test_mismatches_counted() {
        let evaluation =
            evaluate(&["y", "n", "maybe", "y"], &FormatHints::default()).unwrap();
        assert_eq!(evaluation.mismatches, 1);
        assert_eq!(evaluation.example_non_match.as_deref(), Some("maybe"));
    }
}
