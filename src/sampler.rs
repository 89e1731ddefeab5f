//! Column sampling over a [`RowReader`].

use std::io::{Read, Seek};

use foldhash::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Result, SieveError};
use crate::reader::RowReader;

/// Limits for one sampling pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleOptions {
    /// Maximum non-null values kept per column.
    pub sample_size: usize,
    /// Maximum records scanned, since sparse columns need more rows.
    pub max_records: u64,
    /// Values equal to this literal are skipped. Falls back to the dialect's
    /// `treat_as_null`.
    pub treat_as_null: Option<String>,
    /// Samples with fewer distinct values are flagged `too_few_distinct`.
    pub min_distinct: usize,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            sample_size: 200,
            max_records: 10_000,
            treat_as_null: None,
            min_distinct: 3,
        }
    }
}

/// Raw values collected for one column.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnSample {
    pub name: String,
    pub index: usize,
    /// Non-null values in file order, at most `sample_size` of them.
    pub values: Vec<String>,
    /// Records scanned to fill the sample.
    pub records_read: u64,
    /// Fewer distinct values than the minimum needed to decide.
    pub too_few_distinct: bool,
    /// The scan reached the end of the data.
    pub reached_end: bool,
}

impl ColumnSample {
    /// Build a sample from values gathered elsewhere.
    pub fn from_values<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        Self {
            name: name.into(),
            records_read: values.len() as u64,
            values,
            ..Self::default()
        }
    }

    pub fn distinct_count(&self) -> usize {
        self.values.iter().collect::<HashSet<_>>().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Collects [`ColumnSample`]s from a reader.
///
/// Every collection starts over at the first data row, so a second pass
/// (for example with other detection options) sees the same rows without
/// reading the header again.
#[derive(Debug)]
pub struct Sampler<R> {
    reader: RowReader<R>,
    options: SampleOptions,
}

impl<R: Read + Seek> Sampler<R> {
    pub fn new(reader: RowReader<R>, options: SampleOptions) -> Self {
        Self { reader, options }
    }

    pub fn options(&self) -> &SampleOptions {
        &self.options
    }

    pub fn reader(&self) -> &RowReader<R> {
        &self.reader
    }

    pub fn reader_mut(&mut self) -> &mut RowReader<R> {
        &mut self.reader
    }

    pub fn into_reader(self) -> RowReader<R> {
        self.reader
    }

    /// Return to the first data row.
    pub fn restart(&mut self) -> Result<()> {
        self.reader.rewind()
    }

    /// Sample one column.
    pub fn collect_column(&mut self, index: usize) -> Result<ColumnSample> {
        let mut samples = self.collect(&[index])?;
        samples.pop().ok_or(SieveError::EmptyData)
    }

    /// Sample every column in one pass.
    pub fn collect_all(&mut self) -> Result<Vec<ColumnSample>> {
        let columns: Vec<usize> = (0..self.reader.column_count()).collect();
        self.collect(&columns)
    }

    /// Sample the given columns in one pass.
    pub fn collect(&mut self, columns: &[usize]) -> Result<Vec<ColumnSample>> {
        let mut pass = self.begin(columns)?;
        while pass.wants_more(&self.options) {
            let more = self.reader.read()?;
            self.absorb(&mut pass, more);
        }
        self.finish(pass)
    }

    /// Sample the given columns, observing `cancel` between rows.
    pub async fn collect_async(
        &mut self,
        columns: &[usize],
        cancel: &CancellationToken,
    ) -> Result<Vec<ColumnSample>> {
        let mut pass = self.begin(columns)?;
        while pass.wants_more(&self.options) {
            let more = self.reader.read_async(cancel).await?;
            self.absorb(&mut pass, more);
        }
        self.finish(pass)
    }

    fn begin(&mut self, columns: &[usize]) -> Result<Pass> {
        if self.options.sample_size == 0 || self.options.max_records == 0 {
            return Err(SieveError::InvalidConfig(
                "sample_size and max_records must be at least 1".to_string(),
            ));
        }
        let available = self.reader.column_count();
        if available == 0 {
            return Err(SieveError::EmptyData);
        }
        if let Some(&index) = columns.iter().find(|&&i| i >= available) {
            return Err(SieveError::ColumnOutOfRange { index, available });
        }
        self.reader.rewind()?;

        let headers = self.reader.headers();
        let samples = columns
            .iter()
            .map(|&index| ColumnSample {
                name: headers[index].clone(),
                index,
                ..ColumnSample::default()
            })
            .collect();
        Ok(Pass {
            samples,
            records: 0,
            reached_end: false,
        })
    }

    fn absorb(&self, pass: &mut Pass, more: bool) {
        if !more {
            pass.reached_end = true;
            return;
        }
        pass.records += 1;

        let null = self
            .options
            .treat_as_null
            .as_deref()
            .or(self.reader.dialect().treat_as_null.as_deref());
        for sample in &mut pass.samples {
            if sample.values.len() >= self.options.sample_size {
                continue;
            }
            let Some(value) = self.reader.get(sample.index) else {
                continue;
            };
            if value.trim().is_empty() || null.is_some_and(|n| n == value) {
                continue;
            }
            sample.values.push(value.to_string());
        }
    }

    fn finish(&self, pass: Pass) -> Result<Vec<ColumnSample>> {
        if pass.records == 0 {
            return Err(SieveError::EmptyData);
        }
        let samples: Vec<ColumnSample> = pass
            .samples
            .into_iter()
            .map(|mut sample| {
                sample.records_read = pass.records;
                sample.reached_end = pass.reached_end;
                sample.too_few_distinct = sample.distinct_count() < self.options.min_distinct;
                sample
            })
            .collect();
        debug!(
            columns = samples.len(),
            records = pass.records,
            reached_end = pass.reached_end,
            "sampling pass complete"
        );
        Ok(samples)
    }
}

/// State of one sampling pass.
struct Pass {
    samples: Vec<ColumnSample>,
    records: u64,
    reached_end: bool,
}

impl Pass {
    fn wants_more(&self, options: &SampleOptions) -> bool {
        !self.reached_end
            && self.records < options.max_records
            && self
                .samples
                .iter()
                .any(|s| s.values.len() < options.sample_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use std::io::Cursor;

    fn sampler(data: &str, options: SampleOptions) -> Sampler<Cursor<Vec<u8>>> {
        let reader = RowReader::open(Cursor::new(data.as_bytes().to_vec()), Dialect::default())
            .unwrap();
        Sampler::new(reader, options)
    }

    #[test]
    fn test_collect_skips_nulls_and_counts_records() {
        let options = SampleOptions {
            sample_size: 2,
            treat_as_null: Some("NULL".into()),
            ..SampleOptions::default()
        };
        let mut s = sampler("a,b\n1,\n2,NULL\n3,x\n4,y\n5,z\n", options);
        let samples = s.collect(&[1]).unwrap();
        assert_eq!(samples[0].name, "b");
        assert_eq!(samples[0].values, vec!["x", "y"]);
        assert_eq!(samples[0].records_read, 4);
        assert!(!samples[0].reached_end);
        assert!(samples[0].too_few_distinct);
    }

    #[test]
    fn test_collect_all_reaches_end() {
        let mut s = sampler("a,b\n1,x\n2,y\n3,z\n", SampleOptions::default());
        let samples = s.collect_all().unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].values, vec!["1", "2", "3"]);
        assert!(samples.iter().all(|s| s.reached_end && s.records_read == 3));
        assert!(!samples[0].too_few_distinct);
    }

    #[test]
    fn test_max_records_bounds_scan() {
        let options = SampleOptions {
            max_records: 2,
            ..SampleOptions::default()
        };
        let mut s = sampler("a\n1\n2\n3\n4\n", options);
        let sample = s.collect_column(0).unwrap();
        assert_eq!(sample.values, vec!["1", "2"]);
        assert_eq!(sample.records_read, 2);
    }

    #[test]
    fn test_second_pass_sees_same_rows() {
        let mut s = sampler("a,b\n1,x\n2,y\n", SampleOptions::default());
        let first = s.collect_column(0).unwrap();
        let second = s.collect_column(1).unwrap();
        assert_eq!(first.values, vec!["1", "2"]);
        assert_eq!(second.values, vec!["x", "y"]);
        assert_eq!(s.reader().headers(), ["a", "b"]);
    }

    #[test]
    fn test_empty_source_and_range_errors() {
        let mut s = sampler("a,b\n", SampleOptions::default());
        assert!(matches!(s.collect_column(0), Err(SieveError::EmptyData)));

        let mut s = sampler("", SampleOptions::default());
        assert!(matches!(s.collect_column(0), Err(SieveError::EmptyData)));

        let mut s = sampler("a,b\n1,2\n", SampleOptions::default());
        assert!(matches!(
            s.collect_column(5),
            Err(SieveError::ColumnOutOfRange {
                index: 5,
                available: 2
            })
        ));
    }

    #[test]
    fn test_zero_limits_rejected() {
        for options in [
            SampleOptions {
                sample_size: 0,
                ..SampleOptions::default()
            },
            SampleOptions {
                max_records: 0,
                ..SampleOptions::default()
            },
        ] {
            let mut s = sampler("a\n1\n2\n", options);
            let err = s.collect_all().unwrap_err();
            assert!(err.is_config_error());
        }
    }

    #[tokio::test]
    async fn test_collect_async_cancelled() {
        let mut s = sampler("a\n1\n2\n3\n", SampleOptions::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = s.collect_async(&[0], &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_collect_async_completes() {
        let mut s = sampler("a\n1\n2\n3\n", SampleOptions::default());
        let samples = s
            .collect_async(&[0], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(samples[0].values, vec!["1", "2", "3"]);
    }
}
