use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::debug;

use crate::IngestError;

/// Extract the text of every page of a PDF held in memory.
///
/// Parsing is CPU-bound; async callers should run this on a blocking thread.
/// Documents whose text is empty or whitespace-only yield
/// [`IngestError::NoExtractableText`].
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, IngestError> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let text = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)))
        .map_err(|_| IngestError::Pdf("parser aborted on malformed document".into()))?
        .map_err(|e| IngestError::Pdf(e.to_string()))?;

    if text.trim().is_empty() {
        return Err(IngestError::NoExtractableText);
    }
    debug!(bytes = bytes.len(), chars = text.chars().count(), "extracted pdf text");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single-page PDF with a correct xref table drawing `content`.
    fn build_pdf(content: &str) -> Vec<u8> {
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>"
                .to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, obj) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, obj).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(
            format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes(),
        );
        for offset in offsets {
            out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn extracts_text_from_simple_pdf() {
        let pdf = build_pdf(
            "BT /F1 24 Tf 72 720 Td (The quick brown fox jumps over the lazy dog.) Tj ET",
        );
        let text = extract_pdf_text(&pdf).unwrap();
        assert!(text.contains("quick brown fox"), "got {text:?}");
    }

    #[test]
    fn blank_page_has_no_text() {
        let pdf = build_pdf("");
        assert_eq!(extract_pdf_text(&pdf), Err(IngestError::NoExtractableText));
    }

    #[test]
    fn garbage_is_a_pdf_error() {
        let err = extract_pdf_text(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, IngestError::Pdf(_)));
    }
}
