//! Pull-based row cursor over a delimited text source.

use std::fs::File;
use std::io::{Read, Seek};
use std::mem;
use std::path::Path;

use foldhash::{HashMap, HashMapExt, HashSet, HashSetExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::dialect::{Dialect, TrimmingOption};
use crate::encoding::TextEncoding;
use crate::error::{Result, SieveError};
use crate::line_source::{Bookmark, LineEnding, LineSource};
use crate::tokenizer::{Event, FieldState, Input, Syntax, Transition};

/// One logical row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Field values, fitted to the header's column count.
    pub fields: Vec<String>,
    /// 1-based physical line the row starts on.
    pub start_line: u64,
    /// 1-based physical line the row ends on.
    pub end_line: u64,
    /// Running count of logical data rows, starting at 1.
    pub record_number: u64,
}

/// Saved reader position, see [`RowReader::bookmark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBookmark {
    source: Bookmark,
    record_number: u64,
    diagnostics_len: usize,
}

#[derive(Debug, Default)]
struct Field {
    value: String,
    quoted: bool,
}

/// Accumulates the events of one row.
#[derive(Debug, Default)]
struct RowBuilder {
    fields: Vec<Field>,
    current: Field,
    done: bool,
    issues: Vec<(Option<usize>, DiagnosticKind)>,
}

impl RowBuilder {
    fn apply(&mut self, transition: Transition) {
        for event in transition.events() {
            match event {
                Event::Append(c) => self.current.value.push(c),
                Event::OpenQuote => self.current.quoted = true,
                Event::EndField => self.fields.push(mem::take(&mut self.current)),
                Event::EndRow => {
                    self.fields.push(mem::take(&mut self.current));
                    self.done = true;
                }
                Event::Fold => self.issues.push((None, DiagnosticKind::RowCombined)),
                Event::Warn(kind) => self.issues.push((Some(self.fields.len()), kind)),
            }
        }
    }
}

struct RowParts {
    fields: Vec<Field>,
    start_line: u64,
    end_line: u64,
}

/// Reads rows of raw field strings from a byte stream according to a
/// [`Dialect`].
///
/// Malformed input never fails a read: issues are recorded in
/// [`RowReader::diagnostics`] and the row is returned with best-effort
/// values. Only I/O failures and cancellation end a scan with an error.
///
/// # Example
///
/// ```
/// use csv_sieve::{Dialect, RowReader};
/// use std::io::Cursor;
///
/// let data = "name,age\nAlice,30\nBob,25\n";
/// let mut reader = RowReader::open(Cursor::new(data), Dialect::default()).unwrap();
/// while reader.read().unwrap() {
///     println!("{:?} is {:?}", reader.get(0), reader.get_by_name("age"));
/// }
/// ```
#[derive(Debug)]
pub struct RowReader<R> {
    source: LineSource<R>,
    dialect: Dialect,
    syntax: Syntax,
    headers: Vec<String>,
    header_index: HashMap<String, usize>,
    expected_columns: Option<usize>,
    current: Option<RawRow>,
    record_number: u64,
    diagnostics: Diagnostics,
    data_start: Bookmark,
    header_diagnostics: usize,
    empty_line_run: usize,
    end_of_data: bool,
    cancelled: bool,
}

impl RowReader<File> {
    /// Open a file for reading.
    pub fn from_path<P: AsRef<Path>>(path: P, dialect: Dialect) -> Result<Self> {
        dialect.validate()?;
        let file = File::open(path.as_ref())?;
        Self::open(file, dialect)
    }
}

impl<R: Read + Seek> RowReader<R> {
    /// Open a reader over a seekable stream.
    ///
    /// Validates the dialect, resolves the encoding, skips the configured
    /// leading lines and reads the header row.
    pub fn open(inner: R, dialect: Dialect) -> Result<Self> {
        dialect.validate()?;
        let mut source = LineSource::open(inner, dialect.encoding)?;
        let data_start = source.bookmark();
        let syntax = Syntax::from_dialect(&dialect);

        let mut reader = Self {
            source,
            dialect,
            syntax,
            headers: Vec::new(),
            header_index: HashMap::new(),
            expected_columns: None,
            current: None,
            record_number: 0,
            diagnostics: Diagnostics::new(),
            data_start,
            header_diagnostics: 0,
            empty_line_run: 0,
            end_of_data: false,
            cancelled: false,
        };

        for _ in 0..reader.dialect.skip_rows {
            if reader.source.read_line()?.is_none() {
                break;
            }
        }

        let names = if reader.dialect.has_header {
            reader
                .read_fields(0)?
                .map(|parts| reader.finish_fields(parts.fields, 0))
                .map(|raw| normalize_headers(raw, &mut reader.diagnostics))
        } else {
            // Peek at the first row for the column count, then step back.
            let mark = reader.source.bookmark();
            let before = reader.diagnostics.len();
            let width = reader.read_fields(1)?.map(|parts| parts.fields.len());
            reader.source.restore(mark)?;
            reader.source.release(mark)?;
            reader.diagnostics.truncate(before);
            reader.empty_line_run = 0;
            reader.end_of_data = false;
            width.map(|n| (1..=n).map(|i| format!("column_{i}")).collect())
        };

        if let Some(names) = names {
            reader.expected_columns = Some(names.len());
            reader.header_index = names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect();
            reader.headers = names;
        }
        debug!(
            columns = reader.headers.len(),
            encoding = %reader.source.encoding(),
            "opened delimited source"
        );

        reader.source.release(reader.data_start)?;
        reader.data_start = reader.source.bookmark();
        reader.header_diagnostics = reader.diagnostics.len();
        Ok(reader)
    }

    /// Advance to the next row. Returns `false` once the data is exhausted.
    pub fn read(&mut self) -> Result<bool> {
        if self.cancelled {
            return Err(SieveError::Cancelled);
        }
        if self.end_of_data {
            self.current = None;
            return Ok(false);
        }

        let row = self.record_number + 1;
        let parts = match self.read_fields(row) {
            Ok(Some(parts)) => parts,
            Ok(None) => {
                self.end_of_data = true;
                self.current = None;
                return Ok(false);
            }
            Err(e) => {
                warn!(record = row, error = %e, "read aborted");
                self.diagnostics
                    .fatal(row, DiagnosticKind::Io, e.to_string());
                self.end_of_data = true;
                self.current = None;
                return Err(e);
            }
        };

        let mut fields = self.finish_fields(parts.fields, row);
        self.fit_columns(&mut fields, row);
        self.record_number = row;
        trace!(record = row, fields = fields.len(), "read row");
        self.current = Some(RawRow {
            fields,
            start_line: parts.start_line,
            end_line: parts.end_line,
            record_number: row,
        });
        Ok(true)
    }

    /// Like [`RowReader::read`], but observes `cancel` before and after the
    /// row and yields to the runtime in between.
    ///
    /// After a cancellation every further read fails with
    /// [`SieveError::Cancelled`] and no more rows are produced.
    pub async fn read_async(&mut self, cancel: &CancellationToken) -> Result<bool> {
        if cancel.is_cancelled() {
            return Err(self.cancel());
        }
        let more = self.read()?;
        tokio::task::yield_now().await;
        if cancel.is_cancelled() {
            return Err(self.cancel());
        }
        Ok(more)
    }

    /// Save the current position, including the record count.
    pub fn bookmark(&mut self) -> RowBookmark {
        RowBookmark {
            source: self.source.bookmark(),
            record_number: self.record_number,
            diagnostics_len: self.diagnostics.len(),
        }
    }

    /// Return to a bookmarked position. Diagnostics recorded after the
    /// bookmark are discarded, since the rows will be read again.
    pub fn restore(&mut self, bookmark: RowBookmark) -> Result<()> {
        self.source.restore(bookmark.source)?;
        self.record_number = bookmark.record_number;
        self.diagnostics.truncate(bookmark.diagnostics_len);
        self.reset_scan_state();
        Ok(())
    }

    /// Free a bookmark's slot.
    pub fn release(&mut self, bookmark: RowBookmark) -> Result<()> {
        self.source.release(bookmark.source)
    }

    /// Restart at the first data row without reading the header again.
    pub fn rewind(&mut self) -> Result<()> {
        if self.cancelled {
            return Err(SieveError::Cancelled);
        }
        self.source.restore(self.data_start)?;
        self.record_number = 0;
        self.diagnostics.truncate(self.header_diagnostics);
        self.reset_scan_state();
        Ok(())
    }

    /// Stop reading and invalidate all bookmarks.
    pub fn close(&mut self) {
        self.source.close();
        self.end_of_data = true;
        self.current = None;
    }

    pub fn into_inner(self) -> R {
        self.source.into_inner()
    }

    /// Column names, generated as `column_{n}` when the source has no header.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Index of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header_index.get(name).copied()
    }

    /// The current row, if positioned on one.
    pub fn current(&self) -> Option<&RawRow> {
        self.current.as_ref()
    }

    /// Field of the current row by position.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.current
            .as_ref()
            .and_then(|row| row.fields.get(index))
            .map(String::as_str)
    }

    /// Field of the current row by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.column_index(name).and_then(|index| self.get(index))
    }

    /// Record number of the current row, 0 before the first read.
    pub fn record_number(&self) -> u64 {
        self.record_number
    }

    pub fn start_line_number(&self) -> Option<u64> {
        self.current.as_ref().map(|row| row.start_line)
    }

    pub fn end_line_number(&self) -> Option<u64> {
        self.current.as_ref().map(|row| row.end_line)
    }

    /// Whether the last read hit the end of the data.
    pub fn is_end_of_data(&self) -> bool {
        self.end_of_data
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn encoding(&self) -> TextEncoding {
        self.source.encoding()
    }

    /// The first line ending seen, for writers that want to reproduce it.
    pub fn line_ending(&self) -> Option<LineEnding> {
        self.source.line_ending()
    }

    /// Whether old Mac line endings (a CR without LF) were seen.
    pub fn saw_lone_cr(&self) -> bool {
        self.source.saw_lone_cr()
    }

    fn cancel(&mut self) -> SieveError {
        debug!(record = self.record_number, "scan cancelled");
        self.cancelled = true;
        self.end_of_data = true;
        self.current = None;
        SieveError::Cancelled
    }

    fn reset_scan_state(&mut self) {
        self.current = None;
        self.end_of_data = false;
        self.empty_line_run = 0;
    }

    /// Tokenize the next logical row, skipping comments and empty lines.
    fn read_fields(&mut self, row: u64) -> Result<Option<RowParts>> {
        let mut state = FieldState::AfterField;
        let mut builder = RowBuilder::default();
        let mut start_line = None;
        let mut end_line = 0;

        while !builder.done {
            let Some(line) = self.source.read_line()? else {
                if start_line.is_none() {
                    return Ok(None);
                }
                builder.apply(self.syntax.step(state, Input::EndOfInput));
                break;
            };

            if start_line.is_none() {
                if self.dialect.comment().is_some_and(|p| line.text.starts_with(p)) {
                    continue;
                }
                if line.text.is_empty() && self.dialect.skip_empty_lines {
                    self.empty_line_run += 1;
                    let limit = self.dialect.consecutive_empty_rows;
                    if limit > 0 && self.empty_line_run >= limit {
                        self.end_of_data = true;
                        return Ok(None);
                    }
                    continue;
                }
                self.empty_line_run = 0;
                start_line = Some(line.number);
            }
            end_line = line.number;
            if line.had_decode_errors {
                builder
                    .issues
                    .push((None, DiagnosticKind::EncodingFallback));
            }

            for c in line.text.chars() {
                let transition = self.syntax.step(state, Input::Char(c));
                state = transition.next;
                builder.apply(transition);
            }

            // The last line may have no terminator; do not invent one.
            let Some(ending) = line.ending else {
                builder.apply(self.syntax.step(state, Input::EndOfInput));
                break;
            };
            let fold = self.dialect.allow_row_combining
                && self
                    .expected_columns
                    .is_some_and(|n| builder.fields.len() + 1 < n);
            let transition = self.syntax.step(state, Input::LineBreak { ending, fold });
            state = transition.next;
            builder.apply(transition);
        }

        for (column, kind) in builder.issues {
            if kind == DiagnosticKind::QuoteInUnquotedField && !self.dialect.warn_quotes {
                continue;
            }
            self.diagnostics.warn(row, column, kind);
        }

        Ok(start_line.map(|start_line| RowParts {
            fields: builder.fields,
            start_line,
            end_line,
        }))
    }

    /// Apply value normalization, value warnings and trimming.
    fn finish_fields(&mut self, fields: Vec<Field>, row: u64) -> Vec<String> {
        let dialect = &self.dialect;
        let mut out = Vec::with_capacity(fields.len());

        for (column, field) in fields.into_iter().enumerate() {
            let mut value = field.value;

            if value.contains('\u{A0}') {
                if dialect.treat_nbsp_as_space {
                    value = value.replace('\u{A0}', " ");
                } else if dialect.warn_nbsp {
                    self.diagnostics
                        .warn(row, Some(column), DiagnosticKind::NonBreakingSpace);
                }
            }
            if value.contains('\n') {
                if dialect.warn_line_feed {
                    self.diagnostics
                        .warn(row, Some(column), DiagnosticKind::LineFeedInValue);
                }
                if dialect.treat_lf_as_space {
                    value = value.replace('\n', " ");
                }
            }
            if dialect.warn_delimiter_in_value && field.quoted && value.contains(dialect.delimiter)
            {
                self.diagnostics
                    .warn(row, Some(column), DiagnosticKind::DelimiterInValue);
            }
            if dialect.warn_unknown_character && value.contains(char::REPLACEMENT_CHARACTER) {
                self.diagnostics
                    .warn(row, Some(column), DiagnosticKind::UnknownCharacter);
            }

            let trim = match dialect.trimming {
                TrimmingOption::None => false,
                TrimmingOption::Unquoted => !field.quoted,
                TrimmingOption::All => true,
            };
            if trim && value.trim().len() != value.len() {
                value = value.trim().to_string();
            }
            out.push(value);
        }
        out
    }

    /// Bring a data row to the header's column count.
    fn fit_columns(&mut self, fields: &mut Vec<String>, row: u64) {
        let Some(expected) = self.expected_columns else {
            return;
        };
        let found = fields.len();

        if found < expected {
            self.diagnostics.warn_with(
                row,
                Some(found),
                DiagnosticKind::MissingColumns,
                format!("expected {expected} columns but found {found}"),
            );
            fields.resize(expected, String::new());
            return;
        }
        if found == expected || expected == 0 {
            return;
        }

        let surplus = &fields[expected..];
        if surplus.len() <= self.dialect.column_tolerance && surplus.iter().all(String::is_empty)
        {
            if self.dialect.warn_empty_trailing_columns {
                self.diagnostics
                    .warn(row, Some(expected), DiagnosticKind::EmptyTrailingColumns);
            }
            fields.truncate(expected);
            return;
        }

        if self.dialect.try_to_solve_more_columns {
            let merged = fields[expected - 1..].join(&self.dialect.delimiter.to_string());
            fields.truncate(expected);
            fields[expected - 1] = merged;
            self.diagnostics.warn_with(
                row,
                Some(expected - 1),
                DiagnosticKind::ColumnsCombined,
                format!(
                    "{} extra columns were combined into column {expected}",
                    found - expected
                ),
            );
        } else {
            self.diagnostics.warn_with(
                row,
                Some(expected),
                DiagnosticKind::ExtraColumns,
                format!("expected {expected} columns but found {found}; extra values ignored"),
            );
            fields.truncate(expected);
        }
    }
}

/// Give empty header names a generated name and make duplicates unique.
fn normalize_headers(raw: Vec<String>, diagnostics: &mut Diagnostics) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut names = Vec::with_capacity(raw.len());

    for (column, name) in raw.into_iter().enumerate() {
        let mut name = if name.is_empty() {
            diagnostics.warn(0, Some(column), DiagnosticKind::EmptyHeader);
            format!("column_{}", column + 1)
        } else {
            name
        };

        if !seen.insert(name.to_lowercase()) {
            let base = name;
            let mut suffix = 2;
            name = loop {
                let candidate = format!("{base}_{suffix}");
                if seen.insert(candidate.to_lowercase()) {
                    break candidate;
                }
                suffix += 1;
            };
            diagnostics.warn_with(
                0,
                Some(column),
                DiagnosticKind::DuplicateHeader,
                format!("duplicate column name {base:?} renamed to {name:?}"),
            );
        }
        names.push(name);
    }
    names
}
