//! Dialect configuration: delimiter, quoting and row-level policies.

use std::fmt;

use crate::encoding::EncodingChoice;
use crate::error::{Result, SieveError};

/// Quote character configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quote {
    /// No quoting.
    None,
    /// Quote with the specified character.
    Some(char),
}

impl Default for Quote {
    fn default() -> Self {
        Quote::Some('"')
    }
}

impl Quote {
    /// Returns the quote character if set.
    pub fn char(&self) -> Option<char> {
        match self {
            Quote::None => None,
            Quote::Some(c) => Some(*c),
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quote::None => write!(f, "none"),
            Quote::Some(c) => write!(f, "{c}"),
        }
    }
}

/// Which field values get surrounding whitespace removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrimmingOption {
    /// Keep values exactly as read.
    None,
    /// Trim values that were not quoted.
    #[default]
    Unquoted,
    /// Trim every value, quoted or not.
    All,
}

/// Syntactic rules of one delimited-text variant.
///
/// Construct with [`Dialect::default`] and adjust the fields. The reader
/// calls [`Dialect::validate`] when it opens a source, so an inconsistent
/// dialect fails at open time rather than on the first read.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialect {
    /// Field delimiter character.
    pub delimiter: char,
    /// Quote character configuration.
    pub quote: Quote,
    /// Escape character; the character after it is taken literally.
    pub escape: Option<char>,
    /// Lines starting with this prefix are skipped.
    pub comment_prefix: Option<String>,
    /// Whether the first row holds column names.
    pub has_header: bool,
    /// Physical lines to skip before the header (or first data row).
    pub skip_rows: usize,
    /// Empty lines between rows are not records.
    pub skip_empty_lines: bool,
    /// This many consecutive empty lines end the data; 0 disables the check.
    pub consecutive_empty_rows: usize,
    /// Fold a line break into the current field when the row is short.
    pub allow_row_combining: bool,
    /// Merge surplus fields back into the last declared column.
    pub try_to_solve_more_columns: bool,
    /// Extra trailing empty fields accepted without a warning.
    pub column_tolerance: usize,
    /// Whitespace trimming of field values.
    pub trimming: TrimmingOption,
    /// Replace line feeds inside values with a space.
    pub treat_lf_as_space: bool,
    /// Replace non-breaking spaces inside values with a space.
    pub treat_nbsp_as_space: bool,
    /// Values equal to this literal count as null when sampling.
    pub treat_as_null: Option<String>,
    /// Encoding detection policy.
    pub encoding: EncodingChoice,
    /// Warn about quote characters inside unquoted values.
    pub warn_quotes: bool,
    /// Warn about delimiter characters inside quoted values.
    pub warn_delimiter_in_value: bool,
    /// Warn about line feeds inside values.
    pub warn_line_feed: bool,
    /// Warn about non-breaking spaces inside values.
    pub warn_nbsp: bool,
    /// Warn about U+FFFD replacement characters inside values.
    pub warn_unknown_character: bool,
    /// Warn when trailing empty columns are dropped.
    pub warn_empty_trailing_columns: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: Quote::default(),
            escape: None,
            comment_prefix: None,
            has_header: true,
            skip_rows: 0,
            skip_empty_lines: true,
            consecutive_empty_rows: 0,
            allow_row_combining: false,
            try_to_solve_more_columns: false,
            column_tolerance: 1,
            trimming: TrimmingOption::default(),
            treat_lf_as_space: false,
            treat_nbsp_as_space: false,
            treat_as_null: None,
            encoding: EncodingChoice::default(),
            warn_quotes: true,
            warn_delimiter_in_value: false,
            warn_line_feed: false,
            warn_nbsp: true,
            warn_unknown_character: true,
            warn_empty_trailing_columns: false,
        }
    }
}

impl Dialect {
    /// Create a dialect with the given delimiter and defaults otherwise.
    pub fn with_delimiter(delimiter: char) -> Self {
        Self {
            delimiter,
            ..Self::default()
        }
    }

    /// Check that delimiter, quote and escape are usable together.
    pub fn validate(&self) -> Result<()> {
        let is_line_break = |c: char| c == '\r' || c == '\n';

        if is_line_break(self.delimiter) {
            return Err(SieveError::InvalidConfig(
                "delimiter cannot be a line break".to_string(),
            ));
        }
        if let Some(q) = self.quote.char() {
            if is_line_break(q) {
                return Err(SieveError::InvalidConfig(
                    "quote character cannot be a line break".to_string(),
                ));
            }
            if q == self.delimiter {
                return Err(SieveError::InvalidConfig(format!(
                    "delimiter and quote character are both {q:?}"
                )));
            }
        }
        if let Some(e) = self.escape {
            if is_line_break(e) {
                return Err(SieveError::InvalidConfig(
                    "escape character cannot be a line break".to_string(),
                ));
            }
            if e == self.delimiter {
                return Err(SieveError::InvalidConfig(format!(
                    "delimiter and escape character are both {e:?}"
                )));
            }
            if self.quote.char() == Some(e) {
                return Err(SieveError::InvalidConfig(format!(
                    "quote and escape character are both {e:?}"
                )));
            }
        }
        Ok(())
    }

    /// The comment prefix, ignoring an empty configured prefix.
    pub(crate) fn comment(&self) -> Option<&str> {
        self.comment_prefix.as_deref().filter(|p| !p.is_empty())
    }
}

/// Chained construction of a validated [`Dialect`].
///
/// # Example
///
/// ```
/// use csv_sieve::{DialectBuilder, Quote};
///
/// let dialect = DialectBuilder::new()
///     .delimiter('\t')
///     .quote(Quote::None)
///     .comment_prefix("#")
///     .skip_rows(2)
///     .build()
///     .unwrap();
/// assert_eq!(dialect.delimiter, '\t');
/// ```
#[derive(Debug, Clone, Default)]
pub struct DialectBuilder {
    dialect: Dialect,
}

impl DialectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(&mut self, delimiter: char) -> &mut Self {
        self.dialect.delimiter = delimiter;
        self
    }

    pub fn quote(&mut self, quote: Quote) -> &mut Self {
        self.dialect.quote = quote;
        self
    }

    pub fn escape(&mut self, escape: Option<char>) -> &mut Self {
        self.dialect.escape = escape;
        self
    }

    pub fn comment_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.dialect.comment_prefix = Some(prefix.into());
        self
    }

    pub fn has_header(&mut self, has_header: bool) -> &mut Self {
        self.dialect.has_header = has_header;
        self
    }

    pub fn skip_rows(&mut self, skip_rows: usize) -> &mut Self {
        self.dialect.skip_rows = skip_rows;
        self
    }

    pub fn consecutive_empty_rows(&mut self, rows: usize) -> &mut Self {
        self.dialect.consecutive_empty_rows = rows;
        self
    }

    pub fn allow_row_combining(&mut self, allow: bool) -> &mut Self {
        self.dialect.allow_row_combining = allow;
        self
    }

    pub fn try_to_solve_more_columns(&mut self, enable: bool) -> &mut Self {
        self.dialect.try_to_solve_more_columns = enable;
        self
    }

    pub fn column_tolerance(&mut self, tolerance: usize) -> &mut Self {
        self.dialect.column_tolerance = tolerance;
        self
    }

    pub fn trimming(&mut self, trimming: TrimmingOption) -> &mut Self {
        self.dialect.trimming = trimming;
        self
    }

    pub fn treat_as_null(&mut self, literal: impl Into<String>) -> &mut Self {
        self.dialect.treat_as_null = Some(literal.into());
        self
    }

    pub fn encoding(&mut self, encoding: EncodingChoice) -> &mut Self {
        self.dialect.encoding = encoding;
        self
    }

    /// Validate and return the dialect.
    pub fn build(&self) -> Result<Dialect> {
        self.dialect.validate()?;
        Ok(self.dialect.clone())
    }
}

/// Normalize a delimiter given by name ("Tab", "Semicolon", "\t", ...) or as
/// a single character.
pub fn parse_delimiter(name: &str) -> Result<char> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(c);
    }

    let delimiter = match name.trim().to_ascii_lowercase().as_str() {
        "tab" | "\\t" | "tabulator" => '\t',
        "comma" => ',',
        "semicolon" => ';',
        "pipe" | "bar" => '|',
        "space" => ' ',
        "colon" => ':',
        "caret" => '^',
        "tilde" => '~',
        "hash" => '#',
        "" => return Err(SieveError::InvalidConfig("empty delimiter".to_string())),
        other => {
            return Err(SieveError::InvalidConfig(format!(
                "unknown delimiter name {other:?}"
            )));
        }
    };
    Ok(delimiter)
}

/// Normalize a quote given by name ("double", "single", "none") or as a
/// single character.
pub fn parse_quote(name: &str) -> Result<Quote> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Ok(Quote::Some(c));
    }
    match name.trim().to_ascii_lowercase().as_str() {
        "" | "none" => Ok(Quote::None),
        "double" => Ok(Quote::Some('"')),
        "single" => Ok(Quote::Some('\'')),
        other => Err(SieveError::InvalidConfig(format!(
            "unknown quote name {other:?}"
        ))),
    }
}
