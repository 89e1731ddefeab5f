//! Inferred column types and their parse parameters.

use std::fmt;

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    /// Whole numbers.
    Integer,
    /// Numbers with a fractional part, exponent or percent sign.
    Numeric,
    /// Two literal values for true and false.
    Boolean,
    /// Dates, date/times and times of day.
    DateTime,
    /// 128-bit identifiers in 8-4-4-4-12 hex notation.
    Guid,
    /// Text (fallback type).
    #[default]
    String,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "Integer"),
            DataType::Numeric => write!(f, "Numeric"),
            DataType::Boolean => write!(f, "Boolean"),
            DataType::DateTime => write!(f, "DateTime"),
            DataType::Guid => write!(f, "Guid"),
            DataType::String => write!(f, "String"),
        }
    }
}

impl DataType {
    /// Returns true if this type is numeric.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Numeric)
    }
}

/// An inferred type together with the parameters needed to parse its values.
///
/// Only the fields relevant to `data_type` are set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueFormat {
    pub data_type: DataType,
    pub decimal_separator: Option<char>,
    pub group_separator: Option<char>,
    /// '%' or '‰' when values carry a percent or permille sign.
    pub percent_sign: Option<char>,
    /// Date token pattern such as "dd/MM/yyyy"; `None` for time-only columns.
    pub date_pattern: Option<String>,
    pub date_separator: Option<char>,
    /// Time-of-day sub-format such as "HH:mm:ss".
    pub time_format: Option<String>,
    /// Name of the column holding this date column's time of day.
    pub time_part: Option<String>,
    pub true_literal: Option<String>,
    pub false_literal: Option<String>,
}

impl ValueFormat {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            ..Self::default()
        }
    }

    pub fn text() -> Self {
        Self::new(DataType::String)
    }

    pub fn guid() -> Self {
        Self::new(DataType::Guid)
    }

    pub fn boolean(true_literal: impl Into<String>, false_literal: impl Into<String>) -> Self {
        Self {
            data_type: DataType::Boolean,
            true_literal: Some(true_literal.into()),
            false_literal: Some(false_literal.into()),
            ..Self::default()
        }
    }

    /// Whether this is a date/time format without a date part.
    pub fn is_time_only(&self) -> bool {
        self.data_type == DataType::DateTime
            && self.date_pattern.is_none()
            && self.time_format.is_some()
    }

    /// Whether this is a date/time format without a time part.
    pub fn is_date_only(&self) -> bool {
        self.data_type == DataType::DateTime
            && self.date_pattern.is_some()
            && self.time_format.is_none()
    }
}

impl fmt::Display for ValueFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data_type)?;
        match self.data_type {
            DataType::Integer | DataType::Numeric => {
                if let Some(decimal) = self.decimal_separator {
                    write!(f, " decimal '{decimal}'")?;
                }
                if let Some(group) = self.group_separator {
                    write!(f, " group '{group}'")?;
                }
                if let Some(sign) = self.percent_sign {
                    write!(f, " {sign}")?;
                }
            }
            DataType::DateTime => {
                let pattern = [self.date_pattern.as_deref(), self.time_format.as_deref()];
                let pattern: Vec<&str> = pattern.into_iter().flatten().collect();
                write!(f, " {}", pattern.join(" "))?;
                if let Some(time_part) = &self.time_part {
                    write!(f, " + time from {time_part:?}")?;
                }
            }
            DataType::Boolean => {
                if let (Some(t), Some(ff)) = (&self.true_literal, &self.false_literal) {
                    write!(f, " {t}/{ff}")?;
                }
            }
            DataType::Guid | DataType::String => {}
        }
        Ok(())
    }
}

/// Outcome of inferring one column.
///
/// `format` is `Some` only for a confident result: every sampled value
/// matched and the sample held enough distinct values (or matched a supplied
/// hint). Text columns are confident `String` results. When inference could
/// not commit, `format` is `None` and `candidate` holds the best structured
/// format that was found:
///
/// - `possible_match` is set when a few values failed the candidate, within
///   the configured tolerance; `mismatches` counts them.
/// - `insufficient_evidence` is set when every value matched but there were
///   too few distinct values to be sure.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GuessResult {
    pub format: Option<ValueFormat>,
    pub possible_match: bool,
    pub insufficient_evidence: bool,
    pub candidate: Option<ValueFormat>,
    /// Values that failed the winning or candidate format.
    pub mismatches: usize,
    /// One value that failed, for display.
    pub example_non_match: Option<String>,
    /// The column looks like an identifier and was left as text.
    pub not_converted: bool,
}

impl GuessResult {
    pub(crate) fn confident(format: ValueFormat) -> Self {
        Self {
            format: Some(format),
            ..Self::default()
        }
    }

    pub(crate) fn text() -> Self {
        Self::confident(ValueFormat::text())
    }

    /// The confident type, or `String` when inference did not commit.
    pub fn data_type(&self) -> DataType {
        self.format
            .as_ref()
            .map(|f| f.data_type)
            .unwrap_or_default()
    }

    /// The confident format or, failing that, the candidate.
    pub fn best_format(&self) -> Option<&ValueFormat> {
        self.format.as_ref().or(self.candidate.as_ref())
    }

    pub fn is_confident(&self) -> bool {
        self.format.is_some()
    }
}
