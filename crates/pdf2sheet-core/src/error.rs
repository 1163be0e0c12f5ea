//! Error types for the pdf2sheet-core library.

use thiserror::Error;

/// Main error type for the pdf2sheet library.
#[derive(Error, Debug)]
pub enum Pdf2SheetError {
    /// PDF decoding error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Persistence error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Spreadsheet or notification collaborator error.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Caller supplied an unusable value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF text decoding.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// No selectable text, most likely a scanned image.
    #[error("PDF contains no selectable text ({0} characters); it might be a scanned image")]
    NoText(usize),
}

/// Errors raised by the template and invoice store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored mapping could not be (de)serialized.
    #[error("invalid stored mapping: {0}")]
    Mapping(#[from] serde_json::Error),

    /// The connection mutex was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// Referenced invoice does not exist.
    #[error("invoice {0} not found")]
    NotFound(i64),
}

/// Errors from the spreadsheet and notification collaborators.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Destination could not be written.
    #[error("write failed: {0}")]
    Write(String),

    /// Destination is not configured.
    #[error("destination missing: {0}")]
    Missing(String),

    /// I/O error while writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A configured regex does not compile.
    #[error("invalid {field} pattern `{pattern}`: {reason}")]
    Pattern {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    /// A configured value is out of range.
    #[error("invalid value for {key}: {reason}")]
    Value { key: String, reason: String },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for the pdf2sheet library.
pub type Result<T> = std::result::Result<T, Pdf2SheetError>;
