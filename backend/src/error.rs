//! Error types for the segmentation pipeline.
//!
//! One error type per layer:
//!
//! - [`CsvError`] - Loading and decoding the input file
//! - [`SegmentationError`] - Binning, key composition, segmentation, aggregation, lookup
//! - [`ConfigError`] - Loading and checking the run configuration
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// CSV Loading Errors
// =============================================================================

/// Errors while reading the input table.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the file content.
    #[error("Failed to decode content as {encoding}: {message}")]
    EncodingError { encoding: String, message: String },

    /// Malformed record.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Delimiters must be a single ASCII byte.
    #[error("Delimiter '{0}' is not a single-byte ASCII character")]
    InvalidDelimiter(char),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Segmentation Errors
// =============================================================================

/// Errors raised by the segmentation core.
#[derive(Debug, Error)]
pub enum SegmentationError {
    /// Bin edges not strictly increasing, or label count != edge count - 1.
    #[error("Invalid bin edges: {0}")]
    InvalidBinEdges(String),

    /// A value falls outside the configured bin edges.
    #[error("Value {value} in column '{column}' (row {row}) is outside the bin range ({lower}, {upper}]")]
    ValueOutOfBinRange {
        column: String,
        row: usize,
        value: f64,
        lower: f64,
        upper: f64,
    },

    /// Segment count/labels mismatch, or not enough distinct values.
    #[error("Invalid segment count: {0}")]
    InvalidSegmentCount(String),

    /// Lookup key matched no row.
    #[error("Identifier not found: {0}")]
    IdentifierNotFound(String),

    /// A referenced column does not exist.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column has the wrong kind for the operation.
    #[error("Column '{column}' must be {expected}")]
    ColumnType { column: String, expected: &'static str },

    /// Columns of different lengths in one table.
    #[error("Column '{column}' has {found} rows, expected {expected}")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Two columns share a name.
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// The first row matching an identifier has no segment.
    #[error("Identifier '{identifier}' matched row {row}, which has no segment")]
    UnsegmentedIdentifier { identifier: String, row: usize },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading or checking a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("Config JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The config parsed but describes an impossible run.
    #[error("Invalid config: {0}")]
    Invalid(#[from] SegmentationError),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV loading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Segmentation error.
    #[error("Segmentation error: {0}")]
    Segmentation(#[from] SegmentationError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// No rows left to segment.
    #[error("No rows to segment ({0} rows before cleaning)")]
    EmptyInput(usize),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for segmentation operations.
pub type SegmentationResult<T> = Result<T, SegmentationError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // SegmentationError -> PipelineError
        let seg_err = SegmentationError::MissingColumn("Price".into());
        let pipeline_err: PipelineError = seg_err.into();
        assert!(pipeline_err.to_string().contains("Price"));

        // SegmentationError -> ConfigError -> PipelineError
        let cfg_err: ConfigError = SegmentationError::InvalidBinEdges("too few".into()).into();
        let pipeline_err: PipelineError = cfg_err.into();
        assert!(pipeline_err.to_string().contains("too few"));
    }

    #[test]
    fn test_out_of_range_format() {
        let err = SegmentationError::ValueOutOfBinRange {
            column: "SaleCheckInDayDiff".into(),
            row: 12,
            value: 950.0,
            lower: -1.0,
            upper: 900.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("SaleCheckInDayDiff"));
        assert!(msg.contains("row 12"));
        assert!(msg.contains("950"));
        assert!(msg.contains("(-1, 900]"));
    }
}
