//! Whole-source inspection: read, sample every column and infer its format.

use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::dialect::Dialect;
use crate::encoding::TextEncoding;
use crate::error::{Result, SieveError};
use crate::inference::{
    DatePreference, DetectionOptions, FormatHints, GuessResult, guess_column, link_date_parts,
};
use crate::line_source::LineEnding;
use crate::reader::RowReader;
use crate::sampler::{ColumnSample, SampleOptions, Sampler};

/// Inference outcome for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReport {
    pub name: String,
    pub index: usize,
    /// Non-null values sampled.
    pub sampled_values: usize,
    pub distinct_values: usize,
    /// `None` when the column held no non-null value in the sampled rows.
    pub guess: Option<GuessResult>,
}

/// Result of inspecting one source.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub dialect: Dialect,
    pub encoding: TextEncoding,
    pub line_ending: Option<LineEnding>,
    pub columns: Vec<ColumnReport>,
    /// Data records read while sampling.
    pub records_sampled: u64,
    /// Whether sampling reached the end of the data.
    pub reached_end: bool,
    /// Diagnostics for the header and the sampled rows.
    pub diagnostics: Diagnostics,
}

impl Inspection {
    /// Report for a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Reads a delimited source and infers the format of every column.
///
/// # Example
///
/// ```
/// use csv_sieve::{DataType, Inspector};
///
/// let data = b"id,price,day\n1,9.99,01/02/2024\n2,15.00,14/02/2024\n3,7.25,28/02/2024\n";
/// let inspection = Inspector::new().inspect_bytes(data).unwrap();
///
/// let price = inspection.column("price").unwrap();
/// assert_eq!(price.guess.as_ref().unwrap().data_type(), DataType::Numeric);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Inspector {
    dialect: Dialect,
    sample: SampleOptions,
    detection: DetectionOptions,
    hints: FormatHints,
}

impl Inspector {
    /// Create an Inspector with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dialect used to read the source.
    pub fn dialect(&mut self, dialect: Dialect) -> &mut Self {
        self.dialect = dialect;
        self
    }

    /// Set the field delimiter.
    pub fn delimiter(&mut self, delimiter: char) -> &mut Self {
        self.dialect.delimiter = delimiter;
        self
    }

    /// Set the number of non-null values sampled per column.
    pub fn sample_size(&mut self, sample_size: usize) -> &mut Self {
        self.sample.sample_size = sample_size;
        self
    }

    /// Set the maximum number of records scanned.
    pub fn max_records(&mut self, max_records: u64) -> &mut Self {
        self.sample.max_records = max_records;
        self
    }

    /// Treat this literal as a null value.
    pub fn treat_as_null(&mut self, literal: impl Into<String>) -> &mut Self {
        self.sample.treat_as_null = Some(literal.into());
        self
    }

    /// Set the detection toggles.
    pub fn detection(&mut self, detection: DetectionOptions) -> &mut Self {
        self.sample.min_distinct = detection.min_distinct;
        self.detection = detection;
        self
    }

    /// Set the format hints.
    pub fn hints(&mut self, hints: FormatHints) -> &mut Self {
        self.hints = hints;
        self
    }

    /// Use the presets of a locale such as "de-DE" as format hints.
    pub fn locale(&mut self, tag: &str) -> &mut Self {
        let hints = FormatHints::for_locale(tag);
        self.hints = FormatHints {
            date_format: self.hints.date_format.take(),
            true_literal: self.hints.true_literal.take(),
            false_literal: self.hints.false_literal.take(),
            ..hints
        };
        self
    }

    /// Set the date order preferred for ambiguous dates.
    pub fn date_preference(&mut self, date_preference: DatePreference) -> &mut Self {
        self.hints.date_preference = Some(date_preference);
        self
    }

    /// Inspect a file at the given path.
    pub fn inspect_path<P: AsRef<Path>>(&self, path: P) -> Result<Inspection> {
        self.dialect.validate()?;
        let file = File::open(path.as_ref())?;
        self.inspect_reader(file)
    }

    /// Inspect in-memory data.
    pub fn inspect_bytes(&self, data: &[u8]) -> Result<Inspection> {
        self.inspect_reader(Cursor::new(data))
    }

    /// Inspect a seekable stream.
    pub fn inspect_reader<R: Read + Seek>(&self, reader: R) -> Result<Inspection> {
        let mut sampler = self.open(reader)?;
        let samples = sampler.collect_all()?;
        self.report(sampler.into_reader(), samples)
    }

    /// Inspect a seekable stream, observing `cancel` between rows.
    pub async fn inspect_async<R: Read + Seek>(
        &self,
        reader: R,
        cancel: &CancellationToken,
    ) -> Result<Inspection> {
        let mut sampler = self.open(reader)?;
        let columns: Vec<usize> = (0..sampler.reader().column_count()).collect();
        let samples = sampler.collect_async(&columns, cancel).await?;
        if cancel.is_cancelled() {
            return Err(SieveError::Cancelled);
        }
        self.report(sampler.into_reader(), samples)
    }

    fn open<R: Read + Seek>(&self, reader: R) -> Result<Sampler<R>> {
        let reader = RowReader::open(reader, self.dialect.clone())?;
        Ok(Sampler::new(reader, self.sample.clone()))
    }

    fn report<R: Read + Seek>(
        &self,
        reader: RowReader<R>,
        samples: Vec<ColumnSample>,
    ) -> Result<Inspection> {
        // Columns are independent; infer them in parallel.
        let mut guesses: Vec<Option<GuessResult>> = samples
            .par_iter()
            .map(|sample| match guess_column(sample, &self.detection, &self.hints) {
                Ok(guess) => Ok(Some(guess)),
                Err(SieveError::NoSamples) => Ok(None),
                Err(e) => Err(e),
            })
            .collect::<Result<_>>()?;

        if self.detection.date_parts {
            let names: Vec<&str> = samples.iter().map(|s| s.name.as_str()).collect();
            let mut linked: Vec<GuessResult> = guesses
                .iter()
                .map(|g| g.clone().unwrap_or_default())
                .collect();
            if link_date_parts(&names, &mut linked) > 0 {
                for (guess, result) in guesses.iter_mut().zip(linked) {
                    if let Some(guess) = guess {
                        *guess = result;
                    }
                }
            }
        }

        let records_sampled = samples.first().map_or(0, |s| s.records_read);
        let reached_end = samples.first().is_some_and(|s| s.reached_end);
        let columns: Vec<ColumnReport> = samples
            .into_iter()
            .zip(guesses)
            .map(|(sample, guess)| ColumnReport {
                distinct_values: sample.distinct_count(),
                sampled_values: sample.values.len(),
                name: sample.name,
                index: sample.index,
                guess,
            })
            .collect();

        debug!(
            columns = columns.len(),
            records = records_sampled,
            diagnostics = reader.diagnostics().len(),
            "inspection complete"
        );
        Ok(Inspection {
            dialect: reader.dialect().clone(),
            encoding: reader.encoding(),
            line_ending: reader.line_ending(),
            columns,
            records_sampled,
            reached_end,
            diagnostics: reader.diagnostics().clone(),
        })
    }
}
