//! Integer and numeric detection under candidate separator pairs.

use super::Evaluation;
use super::options::FormatHints;
use super::value_format::{DataType, ValueFormat};

/// (decimal, group) pairs tried after any hinted pair, in preference order.
const SEPARATOR_PAIRS: &[(char, Option<char>)] = &[
    ('.', None),
    ('.', Some(',')),
    (',', None),
    (',', Some('.')),
    ('.', Some('\'')),
    (',', Some(' ')),
    (',', Some('\u{A0}')),
    ('.', Some(' ')),
];

/// What a successfully parsed number contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct NumberShape {
    pub fraction: bool,
    pub exponent: bool,
    pub group: bool,
    pub percent: Option<char>,
}

/// Parse `value` as a number with the given separators.
///
/// Group separators must split the integer part into a 1-3 digit lead and
/// 3 digit groups. A trailing '%' or '‰' is accepted when `allow_percent`.
pub(crate) fn parse_number(
    value: &str,
    decimal: char,
    group: Option<char>,
    allow_percent: bool,
) -> Option<NumberShape> {
    let mut shape = NumberShape::default();
    let mut s = value.trim();

    if allow_percent {
        if let Some(rest) = s.strip_suffix(['%', '‰']) {
            shape.percent = s.chars().next_back();
            s = rest.trim_end();
        }
    }
    let s = s.strip_prefix(['+', '-']).unwrap_or(s);

    let (mantissa, exponent) = match s.find(['e', 'E']) {
        Some(at) => (&s[..at], Some(&s[at + 1..])),
        None => (s, None),
    };
    if let Some(exponent) = exponent {
        let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
        if !all_digits(digits) {
            return None;
        }
        shape.exponent = true;
    }

    let (int_part, frac_part) = match mantissa.split_once(decimal) {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (mantissa, None),
    };
    if let Some(frac_part) = frac_part {
        if !all_digits(frac_part) {
            return None;
        }
        shape.fraction = true;
    } else if int_part.is_empty() {
        return None;
    }

    match group {
        Some(g) if int_part.contains(g) => {
            let mut groups = int_part.split(g);
            let lead = groups.next().unwrap_or_default();
            if !(1..=3).contains(&lead.len()) || !all_digits(lead) {
                return None;
            }
            if !groups.all(|chunk| chunk.len() == 3 && all_digits(chunk)) {
                return None;
            }
            shape.group = true;
        }
        _ => {
            if !int_part.is_empty() && !all_digits(int_part) {
                return None;
            }
        }
    }
    Some(shape)
}

#[inline]
fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Separator pairs to try, hinted pairs first, without duplicates.
fn separator_pairs(hints: &FormatHints) -> Vec<(char, Option<char>)> {
    let mut pairs = Vec::with_capacity(SEPARATOR_PAIRS.len() + 2);
    if let Some(decimal) = hints.decimal_separator {
        if let Some(group) = hints.group_separator.filter(|&g| g != decimal) {
            pairs.push((decimal, Some(group)));
        }
        pairs.push((decimal, None));
    }
    for &pair in SEPARATOR_PAIRS {
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs
}

/// Evaluate the sample under every separator pair and return the best fit.
pub(crate) fn evaluate(values: &[&str], hints: &FormatHints, allow_percent: bool) -> Option<Evaluation> {
    separator_pairs(hints)
        .into_iter()
        .map(|(decimal, group)| evaluate_pair(values, decimal, group, allow_percent))
        .reduce(Evaluation::better)
}

fn evaluate_pair(
    values: &[&str],
    decimal: char,
    group: Option<char>,
    allow_percent: bool,
) -> Evaluation {
    // The first parsed value decides whether the column carries a percent sign.
    let mut percent: Option<Option<char>> = None;
    let mut fraction = false;
    let mut group_used = false;

    let evaluation = Evaluation::count(values, ValueFormat::default(), |value| {
        let Some(shape) = parse_number(value, decimal, group, allow_percent) else {
            return false;
        };
        if *percent.get_or_insert(shape.percent) != shape.percent {
            return false;
        }
        fraction |= shape.fraction || shape.exponent;
        group_used |= shape.group;
        true
    });

    let percent_sign = percent.flatten();
    let data_type = if fraction || percent_sign.is_some() {
        DataType::Numeric
    } else {
        DataType::Integer
    };
    let format = ValueFormat {
        decimal_separator: (data_type == DataType::Numeric).then_some(decimal),
        group_separator: group.filter(|_| group_used),
        percent_sign,
        ..ValueFormat::new(data_type)
    };
    Evaluation { format, ..evaluation }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_shapes() {
        assert!(parse_number("42", '.', None, false).is_some());
        assert!(parse_number("-3.25", '.', None, false).unwrap().fraction);
        assert!(parse_number(".5", '.', None, false).is_some());
        assert!(parse_number("1.5e-3", '.', None, false).unwrap().exponent);
        assert!(parse_number("1,234,567.89", '.', Some(','), false).unwrap().group);
        assert!(parse_number("1.234,5", ',', Some('.'), false).is_some());

        assert!(parse_number("1,23", '.', Some(','), false).is_none());
        assert!(parse_number("1234,567", '.', Some(','), false).is_none());
        assert!(parse_number("5.", '.', None, false).is_none());
        assert!(parse_number("1.2.3", '.', None, false).is_none());
        assert!(parse_number("abc", '.', None, false).is_none());
        assert!(parse_number("-", '.', None, false).is_none());
        assert!(parse_number("1e", '.', None, false).is_none());
    }

    #[test]
    fn test_parse_percent() {
        let shape = parse_number("12.5 %", '.', None, true).unwrap();
        assert_eq!(shape.percent, Some('%'));
        assert_eq!(parse_number("3‰", '.', None, true).unwrap().percent, Some('‰'));
        assert!(parse_number("12%", '.', None, false).is_none());
    }

    #[test]
    fn test_integer_preferred() {
        let evaluation = evaluate(&["1", "2", "3"], &FormatHints::default(), true).unwrap();
        assert_eq!(evaluation.mismatches, 0);
        assert_eq!(evaluation.format.data_type, DataType::Integer);
        assert_eq!(evaluation.format.decimal_separator, None);
    }

    #[test]
    fn test_group_separator_integer() {
        let evaluation =
            evaluate(&["1,234", "56", "7,890,123"], &FormatHints::default(), true).unwrap();
        assert_eq!(evaluation.format.data_type, DataType::Integer);
        assert_eq!(evaluation.format.group_separator, Some(','));
    }

    #[test]
    fn test_decimal_comma() {
        let evaluation = evaluate(&["1,5", "2,25", "3"], &FormatHints::default(), true).unwrap();
        assert_eq!(evaluation.mismatches, 0);
        assert_eq!(evaluation.format.data_type, DataType::Numeric);
        assert_eq!(evaluation.format.decimal_separator, Some(','));
    }

    #[test]
    fn test_locale_hint_decides_ambiguity() {
        let hints = FormatHints::for_locale("de-DE");
        let evaluation = evaluate(&["1,234", "5,678"], &hints, true).unwrap();
        assert_eq!(evaluation.format.data_type, DataType::Numeric);
        assert_eq!(evaluation.format.decimal_separator, Some(','));
    }

    #[test]
    fn test_mixed_percent_is_mismatch() {
        let evaluation = evaluate(&["10%", "20%", "30"], &FormatHints::default(), true).unwrap();
        assert_eq!(evaluation.mismatches, 1);
        assert_eq!(evaluation.format.percent_sign, Some('%'));
        assert_eq!(evaluation.example_non_match.as_deref(), Some("30"));
    }
}
