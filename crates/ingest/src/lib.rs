//! routerag Ingest Layer
//!
//! This is where uploaded documents become text ready for embedding. We parse
//! the file, turn it into plain text and cut that text into overlapping
//! windows.
//!
//! ## What we do here
//!
//! - **PDF** - pull the text out of every page with `pdf-extract`.
//! - **GPX** - render a route summary (tracks, points, start/end, distance,
//!   elevation gain) instead of embedding raw XML.
//! - **Chunking** - fixed-size character windows with overlap, see [`split`].
//!
//! Nothing here touches the network or the filesystem; callers hand in bytes.
//!
//! ## Example
//!
//! ```
//! use ingest::{ChunkingConfig, DocumentKind};
//!
//! let kind = DocumentKind::from_file_name("Alps.GPX").unwrap();
//! assert_eq!(kind, DocumentKind::Gpx);
//!
//! let chunks = ChunkingConfig::default().split("short text").unwrap();
//! assert_eq!(chunks, vec!["short text"]);
//! ```

mod chunker;
mod error;
mod pdf;
mod route;

pub use crate::chunker::{split, ChunkingConfig};
pub use crate::error::IngestError;
pub use crate::pdf::extract_pdf_text;
pub use crate::route::{haversine_m, summarize_gpx};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Document formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Gpx,
}

impl DocumentKind {
    /// Lowercase file extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "pdf",
            DocumentKind::Gpx => "gpx",
        }
    }

    /// Upper-case label used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Gpx => "GPX",
        }
    }

    /// Kind implied by a file name's extension, case-insensitively.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "gpx" => Some(DocumentKind::Gpx),
            _ => None,
        }
    }

    /// Reject file names that do not carry this kind's extension.
    pub fn check_file_name(self, file_name: &str) -> Result<(), IngestError> {
        if Self::from_file_name(file_name) == Some(self) {
            Ok(())
        } else {
            Err(IngestError::UnsupportedFileType {
                expected: self.label(),
            })
        }
    }

    /// Turn raw file bytes into the text that will be chunked.
    pub fn extract_text(self, file_name: &str, bytes: &[u8]) -> Result<String, IngestError> {
        debug!(kind = self.label(), file_name, bytes = bytes.len(), "extracting text");
        match self {
            DocumentKind::Pdf => extract_pdf_text(bytes),
            DocumentKind::Gpx => summarize_gpx(file_name, bytes),
        }
    }
}
