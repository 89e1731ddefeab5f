//! Row-level diagnostics collected while reading.
//!
//! Records are keyed by record number; the header row uses record 0.

use std::collections::BTreeMap;
use std::fmt;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Parsing continued and the row was yielded with best-effort values.
    Warning,
    /// Parsing stopped.
    Fatal,
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// The row had fewer fields than the header; the rest were left empty.
    MissingColumns,
    /// The row had more fields than the header; the surplus was dropped.
    ExtraColumns,
    /// Surplus fields were merged into the last column.
    ColumnsCombined,
    /// Trailing empty fields were dropped.
    EmptyTrailingColumns,
    /// A quoted field was still open at end of input.
    UnclosedQuote,
    /// A closing quote was followed by something other than a delimiter.
    CharacterAfterQuote,
    /// A quote character appeared inside an unquoted field.
    QuoteInUnquotedField,
    /// An escape character was the last character of the input.
    DanglingEscape,
    /// A quoted value contains the delimiter.
    DelimiterInValue,
    /// A value contains a line feed.
    LineFeedInValue,
    /// A value contains a non-breaking space.
    NonBreakingSpace,
    /// A value contains U+FFFD.
    UnknownCharacter,
    /// Bytes could not be decoded and were replaced.
    EncodingFallback,
    /// A line was folded into the previous row.
    RowCombined,
    /// A header name was empty and got a generated name.
    EmptyHeader,
    /// A header name was repeated and got a suffix.
    DuplicateHeader,
    /// The stream failed while reading.
    Io,
}

impl DiagnosticKind {
    /// Default human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticKind::MissingColumns => "row has fewer columns than expected",
            DiagnosticKind::ExtraColumns => "row has more columns than expected",
            DiagnosticKind::ColumnsCombined => "extra columns were combined into the last column",
            DiagnosticKind::EmptyTrailingColumns => "empty trailing columns were ignored",
            DiagnosticKind::UnclosedQuote => "quoted field is not closed before end of input",
            DiagnosticKind::CharacterAfterQuote => "unexpected character after closing quote",
            DiagnosticKind::QuoteInUnquotedField => "quote character inside an unquoted field",
            DiagnosticKind::DanglingEscape => "escape character at end of input",
            DiagnosticKind::DelimiterInValue => "value contains the delimiter",
            DiagnosticKind::LineFeedInValue => "value contains a line feed",
            DiagnosticKind::NonBreakingSpace => "value contains a non-breaking space",
            DiagnosticKind::UnknownCharacter => "value contains an unknown character",
            DiagnosticKind::EncodingFallback => "invalid bytes for the encoding were replaced",
            DiagnosticKind::RowCombined => "line was combined with the previous row",
            DiagnosticKind::EmptyHeader => "empty column name",
            DiagnosticKind::DuplicateHeader => "duplicate column name",
            DiagnosticKind::Io => "read failed",
        }
    }
}

/// One recorded parsing issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Record number (0 for the header row).
    pub row: u64,
    /// 0-based column index, if the issue belongs to one field.
    pub column: Option<usize>,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row == 0 {
            write!(f, "Header")?;
        } else {
            write!(f, "Row {}", self.row)?;
        }
        if let Some(column) = self.column {
            write!(f, ", column {}", column + 1)?;
        }
        if self.severity == Severity::Fatal {
            write!(f, " (fatal)")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Append-only store of diagnostics with lookup by row.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    by_row: BTreeMap<u64, Vec<usize>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.by_row
            .entry(diagnostic.row)
            .or_default()
            .push(self.entries.len());
        self.entries.push(diagnostic);
    }

    /// Record a warning with the kind's default description.
    pub fn warn(&mut self, row: u64, column: Option<usize>, kind: DiagnosticKind) {
        self.warn_with(row, column, kind, kind.description().to_string());
    }

    /// Record a warning with a custom message.
    pub fn warn_with(
        &mut self,
        row: u64,
        column: Option<usize>,
        kind: DiagnosticKind,
        message: String,
    ) {
        self.push(Diagnostic {
            row,
            column,
            severity: Severity::Warning,
            kind,
            message,
        });
    }

    /// Record a fatal diagnostic.
    pub fn fatal(&mut self, row: u64, kind: DiagnosticKind, message: String) {
        self.push(Diagnostic {
            row,
            column: None,
            severity: Severity::Fatal,
            kind,
            message,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Diagnostics recorded for one row, in order.
    pub fn for_row(&self, row: u64) -> impl Iterator<Item = &Diagnostic> {
        self.by_row
            .get(&row)
            .into_iter()
            .flatten()
            .map(|&i| &self.entries[i])
    }

    /// Number of rows with at least one warning.
    pub fn warning_row_count(&self) -> usize {
        self.by_row
            .values()
            .filter(|indices| {
                indices
                    .iter()
                    .any(|&i| self.entries[i].severity == Severity::Warning)
            })
            .count()
    }

    /// Number of diagnostics of a given kind.
    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn has_fatal(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Fatal)
    }

    /// Render all diagnostics, one per line, in at most `max_chars` characters.
    ///
    /// When the text does not fit, the remainder is summarized as a count.
    pub fn render(&self, max_chars: usize) -> String {
        let mut out = String::new();
        let mut used = 0;
        for (shown, diagnostic) in self.entries.iter().enumerate() {
            let line = diagnostic.to_string();
            let line_chars = line.chars().count();
            let remaining = self.entries.len() - shown;
            let needed = used + line_chars + usize::from(!out.is_empty());
            if (needed > max_chars && shown > 0) || line_chars > max_chars {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("... and {remaining} more"));
                return out;
            }
            used = needed;
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&line);
        }
        out
    }

    /// Drop everything recorded after the first `len` entries.
    pub(crate) fn truncate(&mut self, len: usize) {
        if len >= self.entries.len() {
            return;
        }
        self.entries.truncate(len);
        self.by_row.retain(|_, indices| {
            indices.retain(|&i| i < len);
            !indices.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_row() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(2, Some(1), DiagnosticKind::QuoteInUnquotedField);
        diagnostics.warn(5, None, DiagnosticKind::MissingColumns);
        diagnostics.warn(2, None, DiagnosticKind::ExtraColumns);

        let row2: Vec<_> = diagnostics.for_row(2).map(|d| d.kind).collect();
        assert_eq!(
            row2,
            vec![DiagnosticKind::QuoteInUnquotedField, DiagnosticKind::ExtraColumns]
        );
        assert_eq!(diagnostics.for_row(3).count(), 0);
        assert_eq!(diagnostics.warning_row_count(), 2);
        assert_eq!(diagnostics.len(), 3);
        assert!(!diagnostics.has_fatal());
    }

    #[test]
    fn test_fatal_rows_not_counted_as_warnings() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.fatal(7, DiagnosticKind::Io, "disk gone".into());
        assert!(diagnostics.has_fatal());
        assert_eq!(diagnostics.warning_row_count(), 0);
    }

    #[test]
    fn test_render_is_bounded() {
        let mut diagnostics = Diagnostics::new();
        for row in 1..=50 {
            diagnostics.warn(row, Some(0), DiagnosticKind::MissingColumns);
        }
        let text = diagnostics.render(200);
        assert!(text.starts_with("Row 1, column 1: row has fewer columns"));
        assert!(text.ends_with("more"));
        assert!(text.lines().count() < 50);

        let everything = diagnostics.render(usize::MAX);
        assert_eq!(everything.lines().count(), 50);
    }

    #[test]
    fn test_render_counts_characters() {
        let mut diagnostics = Diagnostics::new();
        let message = "Spalte enthält ein geschütztes Leerzeichen äöü".to_string();
        diagnostics.warn_with(1, None, DiagnosticKind::NonBreakingSpace, message.clone());
        diagnostics.warn_with(2, None, DiagnosticKind::NonBreakingSpace, message);

        let line = "Row 1: Spalte enthält ein geschütztes Leerzeichen äöü";
        let width = line.chars().count();
        assert!(line.len() > width);
        let text = diagnostics.render(width * 2 + 1);
        assert_eq!(text.lines().count(), 2);
        assert!(!text.contains("more"));
        assert_eq!(diagnostics.render(width), format!("{line}\n... and 1 more"));
    }

    #[test]
    fn test_render_header_row() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(0, Some(2), DiagnosticKind::EmptyHeader);
        assert_eq!(diagnostics.render(1000), "Header, column 3: empty column name");
    }

    #[test]
    fn test_truncate_rebuilds_row_index() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(0, None, DiagnosticKind::DuplicateHeader);
        diagnostics.warn(1, None, DiagnosticKind::MissingColumns);
        diagnostics.warn(1, None, DiagnosticKind::ExtraColumns);
        diagnostics.truncate(1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics.for_row(1).count(), 0);
        assert_eq!(diagnostics.for_row(0).count(), 1);
    }
}
