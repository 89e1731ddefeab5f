//! Inputs that steer format inference.

/// Which structured formats inference may choose, and how strict it is.
///
/// Every toggle is a named field so call sites read the same regardless of
/// order:
///
/// ```
/// use csv_sieve::DetectionOptions;
///
/// let options = DetectionOptions {
///     guid: false,
///     ignore_id_columns: true,
///     ..DetectionOptions::default()
/// };
/// assert!(options.numeric);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOptions {
    /// Detect integer and numeric columns.
    pub numeric: bool,
    /// Detect date, date/time and time-only columns.
    pub date_time: bool,
    /// Detect boolean columns.
    pub boolean: bool,
    /// Detect GUID columns.
    pub guid: bool,
    /// Accept a trailing '%' or '‰' on numeric values.
    pub percentage: bool,
    /// Link "X Date" / "X Time" column pairs.
    pub date_parts: bool,
    /// Leave identifier-like integer columns unconverted.
    pub ignore_id_columns: bool,
    /// Fewer distinct values than this only give an insufficient-evidence
    /// result for numeric and date/time formats.
    pub min_distinct: usize,
    /// Fraction of values that may fail a format and still report it as a
    /// possible match.
    pub mismatch_tolerance: f64,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            numeric: true,
            date_time: true,
            boolean: true,
            guid: true,
            percentage: true,
            date_parts: true,
            ignore_id_columns: false,
            min_distinct: 3,
            mismatch_tolerance: 0.1,
        }
    }
}

impl DetectionOptions {
    /// Number of mismatches tolerated in a sample of `total` values.
    pub(crate) fn allowed_mismatches(&self, total: usize) -> usize {
        (total as f64 * self.mismatch_tolerance.clamp(0.0, 1.0)).floor() as usize
    }
}

/// Order of day, month and year in ambiguous dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatePreference {
    /// Day-Month-Year format (e.g., 31/12/2023).
    DmyFormat,
    /// Month-Day-Year format (e.g., 12/31/2023).
    MdyFormat,
    /// Year-Month-Day format (e.g., 2023-12-31).
    YmdFormat,
}

impl DatePreference {
    /// Returns true if day comes before month in ambiguous dates.
    pub fn is_dmy(&self) -> bool {
        matches!(self, DatePreference::DmyFormat)
    }
}

/// Locale-derived or caller-supplied hints.
///
/// Hints are tried first but never force a format the sample contradicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatHints {
    pub decimal_separator: Option<char>,
    pub group_separator: Option<char>,
    /// Preferred order when several date patterns fit.
    pub date_preference: Option<DatePreference>,
    /// A date pattern such as "dd.MM.yyyy HH:mm", accepted even on few samples.
    pub date_format: Option<String>,
    pub true_literal: Option<String>,
    pub false_literal: Option<String>,
}

impl FormatHints {
    /// Presets for a locale tag such as "de-DE", "en_US" or "fr".
    ///
    /// Unknown tags give empty hints.
    pub fn for_locale(tag: &str) -> Self {
        use DatePreference::*;

        let tag = tag.trim().replace('_', "-").to_ascii_lowercase();
        let (language, region) = match tag.split_once('-') {
            Some((language, region)) => (language, Some(region)),
            None => (tag.as_str(), None),
        };

        let (decimal, group, order) = match (language, region) {
            ("en", Some("us" | "ph")) | ("en", None) => ('.', ',', MdyFormat),
            ("en", _) => ('.', ',', DmyFormat),
            ("de", Some("ch")) => ('.', '\'', DmyFormat),
            ("de" | "nl" | "it" | "es" | "pt" | "da" | "tr" | "id", _) => (',', '.', DmyFormat),
            ("fr" | "ru" | "pl" | "cs" | "uk" | "nb" | "fi", _) => (',', '\u{A0}', DmyFormat),
            ("sv" | "lt", _) => (',', '\u{A0}', YmdFormat),
            ("ja" | "zh" | "ko" | "hu", _) => ('.', ',', YmdFormat),
            _ => return Self::default(),
        };

        Self {
            decimal_separator: Some(decimal),
            group_separator: Some(group),
            date_preference: Some(order),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_locale() {
        let de = FormatHints::for_locale("de-DE");
        assert_eq!(de.decimal_separator, Some(','));
        assert_eq!(de.group_separator, Some('.'));
        assert_eq!(de.date_preference, Some(DatePreference::DmyFormat));

        let us = FormatHints::for_locale("en_US");
        assert_eq!(us.date_preference, Some(DatePreference::MdyFormat));

        let gb = FormatHints::for_locale("en-GB");
        assert!(gb.date_preference.is_some_and(|p| p.is_dmy()));

        assert_eq!(
            FormatHints::for_locale("ja").date_preference,
            Some(DatePreference::YmdFormat)
        );
        assert_eq!(FormatHints::for_locale("xx-YY"), FormatHints::default());
    }

    #[test]
    fn test_allowed_mismatches() {
        let options = DetectionOptions::default();
        assert_eq!(options.allowed_mismatches(5), 0);
        assert_eq!(options.allowed_mismatches(20), 2);

        let strict = DetectionOptions {
            mismatch_tolerance: 0.0,
            ..DetectionOptions::default()
        };
        assert_eq!(strict.allowed_mismatches(1000), 0);
    }
}
