use serde::{Deserialize, Serialize};

use crate::IngestError;

/// Window settings for [`split`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunk_size == 0 || self.chunk_overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.chunk_overlap,
            });
        }
        Ok(())
    }

    /// [`split`] with these settings.
    pub fn split(&self, text: &str) -> Result<Vec<String>, IngestError> {
        split(text, self.chunk_size, self.chunk_overlap)
    }
}

/// Split `text` into windows of `chunk_size` characters with stride
/// `chunk_size - overlap`.
///
/// Counts are in `char`s, never bytes, so multi-byte text is never cut inside
/// a code point. The last window ends exactly at the end of the text; dropping
/// the first `overlap` characters of every chunk after the first and joining
/// the rest gives back the input.
///
/// ```
/// let chunks = ingest::split("abcdefghij", 4, 1).unwrap();
/// assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
/// ```
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>, IngestError> {
    if chunk_size == 0 || overlap >= chunk_size {
        return Err(IngestError::InvalidChunking {
            chunk_size,
            overlap,
        });
    }
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char boundary, including the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = bounds.len() - 1;

    if char_len <= chunk_size {
        return Ok(vec![text.to_string()]);
    }

    let stride = chunk_size - overlap;
    let mut chunks = Vec::with_capacity(char_len.div_ceil(stride));
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_len);
        chunks.push(text[bounds[start]..bounds[end]].to_string());
        if end == char_len {
            break;
        }
        start += stride;
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(split("hello", 10, 2).unwrap(), vec!["hello"]);
        assert_eq!(split("exactly10!", 10, 2).unwrap(), vec!["exactly10!"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split("", 10, 2).unwrap().is_empty());
    }

    #[test]
    fn invalid_windows_rejected() {
        assert_eq!(
            split("abc", 0, 0),
            Err(IngestError::InvalidChunking {
                chunk_size: 0,
                overlap: 0
            })
        );
        assert!(split("abc", 5, 5).is_err());
        assert!(split("abc", 5, 9).is_err());
    }

    #[test]
    fn windows_overlap_by_configured_amount() {
        let chunks = split("0123456789abcdef", 6, 2).unwrap();
        assert_eq!(chunks, vec!["012345", "456789", "89abcd", "cdef"]);
    }

    #[test]
    fn reassembly_recovers_input() {
        let text: String = (0..2_537).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for (size, overlap) in [(1000, 200), (7, 0), (7, 6), (100, 99), (1, 0)] {
            let chunks = split(&text, size, overlap).unwrap();
            assert_eq!(reassemble(&chunks, overlap), text, "size={size} overlap={overlap}");
            assert!(chunks.iter().all(|c| c.chars().count() <= size));
        }
    }

    #[test]
    fn counts_chars_not_bytes() {
        let text = "äöüßéèêëïî";
        let chunks = split(text, 4, 1).unwrap();
        assert_eq!(chunks[0], "äöüß");
        assert_eq!(chunks[1], "ßéèê");
        assert_eq!(reassemble(&chunks, 1), text);
    }

    #[test]
    fn config_defaults_and_validation() {
        let cfg = ChunkingConfig::default();
        assert_eq!(cfg.chunk_size, 1000);
        assert_eq!(cfg.chunk_overlap, 200);
        assert!(cfg.validate().is_ok());

        let bad = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100,
        };
        assert!(bad.validate().is_err());
    }
}
