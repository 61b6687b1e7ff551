//! Error types for annotation store operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing flat annotation files.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XML serialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Workbook container error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A row of an annotation file could not be parsed
    #[error("Malformed row {line} in {source_name}: {message}")]
    MalformedRow {
        /// Where the row came from (file path or "<input>")
        source_name: String,
        /// 1-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// A spectrum does not match the wavelength axis
    #[error("Spectrum of '{image}' has {found} bands, expected {expected}")]
    BandMismatch {
        /// Image the spectrum was taken from
        image: String,
        /// Number of wavelength columns
        expected: usize,
        /// Number of values in the spectrum
        found: usize,
    },

    /// Output extension maps to no known table format
    #[error("Unsupported table format for {path:?} (expected .csv or .xlsx)")]
    UnsupportedTableFormat {
        /// Requested output path
        path: PathBuf,
    },
}

impl StoreError {
    /// Create a malformed row error.
    pub fn malformed(source_name: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::MalformedRow {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }
}
