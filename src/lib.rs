//! csv-sieve: tolerant delimited-text reader with column format inference
//!
//! Reads CSV, TSV and similar files the way they come out of real exports:
//! unknown encodings, byte order marks, old Mac line endings, quoted fields
//! with embedded line breaks, rows with too few or too many columns. Problems
//! never stop a scan; they are recorded as [`Diagnostics`] next to the rows.
//!
//! On top of the reader, the inference engine samples each column and
//! guesses whether it holds integers, numbers, booleans, dates, GUIDs or text,
//! including the parameters needed to parse it (separators, date pattern,
//! boolean literals).
//!
//! # Quick Start
//!
//! ```no_run
//! use csv_sieve::Inspector;
//!
//! let inspection = Inspector::new().inspect_path("data.csv").unwrap();
//!
//! println!("Encoding: {}", inspection.encoding);
//! for column in &inspection.columns {
//!     if let Some(guess) = &column.guess {
//!         println!("{}: {:?}", column.name, guess.best_format());
//!     }
//! }
//! ```
//!
//! # Reading rows
//!
//! ```
//! use csv_sieve::{Dialect, RowReader};
//! use std::io::Cursor;
//!
//! let data = "id;comment\n1;\"multi\nline\"\n2;short\n";
//! let mut reader = RowReader::open(Cursor::new(data), Dialect::with_delimiter(';')).unwrap();
//!
//! while reader.read().unwrap() {
//!     println!(
//!         "record {} (lines {:?}-{:?}): {:?}",
//!         reader.record_number(),
//!         reader.start_line_number(),
//!         reader.end_line_number(),
//!         reader.get_by_name("comment"),
//!     );
//! }
//! assert!(reader.diagnostics().is_empty());
//! ```
//!
//! # Cancellation
//!
//! Row reads, sampling passes and inspections have `async` variants that
//! take a [`CancellationToken`](tokio_util::sync::CancellationToken) and stop
//! within one row with [`SieveError::Cancelled`].

mod diagnostics;
mod dialect;
mod encoding;
mod error;
mod inference;
mod inspector;
mod line_source;
mod reader;
mod sampler;
mod tokenizer;

pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use dialect::{Dialect, DialectBuilder, Quote, TrimmingOption, parse_delimiter, parse_quote};
pub use encoding::{EncodingChoice, TextEncoding, detect_encoding, guess_encoding, is_utf8};
pub use error::{Result, SieveError};
pub use inference::{
    DataType, DatePattern, DatePreference, DateToken, DetectionOptions, FormatHints, GuessResult,
    TimeFormat, ValueFormat, guess_column, guess_values, link_date_parts,
};
pub use inspector::{ColumnReport, Inspection, Inspector};
pub use line_source::{Bookmark, Line, LineEnding, LineSource};
pub use reader::{RawRow, RowBookmark, RowReader};
pub use sampler::{ColumnSample, SampleOptions, Sampler};
pub use tokenizer::{Event, FieldState, Input, Syntax, Transition};
