use std::io;
use thiserror::Error;

/// Error type for reading and inference operations.
///
/// Only configuration, I/O and cancellation problems (plus a few explicit
/// range conditions) are errors. Malformed rows and ambiguous formats are
/// reported as data through [`crate::Diagnostics`] and [`crate::GuessResult`].
#[derive(Error, Debug)]
pub enum SieveError {
    /// IO error while opening or reading the source.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Invalid dialect or option combination, detected at open time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The operation observed a cancellation request.
    #[error("Operation was cancelled")]
    Cancelled,

    /// Inference was asked to guess a column without any non-null values.
    #[error("No samples to analyze")]
    NoSamples,

    /// The source has no data rows.
    #[error("Empty file or no data rows")]
    EmptyData,

    /// A requested column does not exist in the source.
    #[error("Column index {index} is out of range ({available} columns)")]
    ColumnOutOfRange { index: usize, available: usize },

    /// A bookmark was used after its source was closed or released.
    #[error("Bookmark is no longer valid")]
    InvalidBookmark,
}

impl SieveError {
    /// Returns true if this is a cooperative cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SieveError::Cancelled)
    }

    /// Returns true if retrying without changing the configuration cannot help.
    pub fn is_config_error(&self) -> bool {
        matches!(self, SieveError::InvalidConfig(_))
    }

    /// Returns true if the underlying stream failed.
    pub fn is_io_error(&self) -> bool {
        matches!(self, SieveError::Io(_))
    }
}

/// Result type alias for reading and inference operations.
pub type Result<T> = std::result::Result<T, SieveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        assert!(SieveError::Cancelled.is_cancelled());
        assert!(SieveError::InvalidConfig("x".into()).is_config_error());
        let io_err: SieveError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(io_err.is_io_error());
        assert!(!io_err.is_cancelled());
    }
}
