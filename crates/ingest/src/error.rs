//! Error types produced by the ingest crate.
//!
//! All errors are typed, cloneable and comparable so callers can match on them
//! and map them to HTTP status codes.
//!
//! | Error | Category |
//! |-------|----------|
//! | [`InvalidChunking`](IngestError::InvalidChunking) | Configuration |
//! | [`UnsupportedFileType`](IngestError::UnsupportedFileType) | Validation |
//! | [`NoExtractableText`](IngestError::NoExtractableText) | Partial content |
//! | [`Pdf`](IngestError::Pdf) / [`Gpx`](IngestError::Gpx) | Malformed document |
//!
//! # HTTP Status Code Mapping
//!
//! ```rust
//! use ingest::IngestError;
//!
//! fn to_http_status(_error: &IngestError) -> u16 {
//!     // Every ingest failure is the caller's document or settings.
//!     400
//! }
//! ```

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    /// `chunk_size` is zero or `overlap` would leave a non-positive stride.
    #[error("invalid chunking: chunk_size {chunk_size} must be positive and greater than overlap {overlap}")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    /// The file name does not carry the expected extension.
    #[error("Only {expected} files are supported.")]
    UnsupportedFileType { expected: &'static str },

    /// The PDF parsed but contained no text.
    #[error("No extractable text found in PDF.")]
    NoExtractableText,

    /// The PDF could not be parsed.
    #[error("Error processing PDF: {0}")]
    Pdf(String),

    /// The GPX document could not be parsed.
    #[error("Error processing GPX: {0}")]
    Gpx(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            IngestError::UnsupportedFileType { expected: "PDF" }.to_string(),
            "Only PDF files are supported."
        );
        assert_eq!(
            IngestError::NoExtractableText.to_string(),
            "No extractable text found in PDF."
        );
        assert!(IngestError::InvalidChunking {
            chunk_size: 10,
            overlap: 10
        }
        .to_string()
        .contains("overlap 10"));
    }
}
